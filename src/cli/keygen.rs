//! Keygen command.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use crate::cli::output;
use crate::core::constants::MASTER_KEY_ENV;
use crate::core::crypto::MasterKey;
use crate::error::{ConfigError, Result};

/// Generate a master key and print it, or write it to `output`.
pub fn execute(output: Option<&Path>, force: bool) -> Result<()> {
    let key = MasterKey::generate()?;
    let encoded = key.to_hex();

    let Some(path) = output else {
        println!("{}", encoded.as_str());
        return Ok(());
    };

    write_key_file(path, encoded.as_bytes(), force)?;
    output::success(&format!("wrote master key to {}", path.display()));
    output::hint(&format!(
        "set [vault] master_key_file = \"{}\" or export {}",
        path.display(),
        MASTER_KEY_ENV
    ));
    Ok(())
}

fn write_key_file(path: &Path, contents: &[u8], force: bool) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => ConfigError::InvalidValue {
            field: "output",
            reason: format!("{} already exists; pass --force to replace it", path.display()),
        }
        .into(),
        _ => crate::error::Error::Io(e),
    })?;

    // an existing file keeps its old mode on truncate
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents)?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    Ok(())
}
