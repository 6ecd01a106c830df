//! Filesystem credential store.
//!
//! Layout under the store directory:
//!
//! ```text
//! users/<sha256(encrypted_email)>.json   one record per credential
//! ssh/<sha256(algorithm base64)>         index entry naming the record file
//! ```
//!
//! Files are created with `create_new`, so an existing record is never
//! overwritten, and are readable only by the owner on Unix.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::CredentialStore;
use crate::core::domain::ProtectedCredential;
use crate::core::ssh::canonical_key;
use crate::error::{ConflictError, StorageError};

const USERS_DIR: &str = "users";
const SSH_DIR: &str = "ssh";

/// JSON-file backend.
pub struct Filesystem {
    root: PathBuf,
    write_lock: Mutex<()>,
}

fn digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

fn create_new(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

impl Filesystem {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        for dir in [USERS_DIR, SSH_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|e| {
                StorageError::Unavailable(format!("{}: {}", path.display(), e))
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&path, fs::Permissions::from_mode(0o700))?;
            }
        }

        debug!(path = %root.display(), "opened credential store");
        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    fn user_path(&self, encrypted_email: &str) -> PathBuf {
        self.root
            .join(USERS_DIR)
            .join(format!("{}.json", digest(encrypted_email)))
    }

    fn ssh_path(&self, ssh_public_key: &str) -> PathBuf {
        self.root
            .join(SSH_DIR)
            .join(digest(&canonical_key(ssh_public_key)))
    }

    fn write_record(&self, path: &Path, credential: &ProtectedCredential) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(credential)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        let mut file = match create_new(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(ConflictError::EmailExists))
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = file.write_all(&json).and_then(|_| file.sync_all()) {
            let _ = fs::remove_file(path);
            return Err(e.into());
        }
        Ok(())
    }

    fn write_index(&self, path: &Path, record_name: &str) -> Result<(), StorageError> {
        let mut file = match create_new(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(ConflictError::SshKeyExists))
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = file.write_all(record_name.as_bytes()) {
            let _ = fs::remove_file(path);
            return Err(e.into());
        }
        Ok(())
    }
}

impl CredentialStore for Filesystem {
    fn store_credential(&self, credential: &ProtectedCredential) -> Result<(), StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))?;

        let user_path = self.user_path(&credential.encrypted_email);
        let ssh_path = self.ssh_path(&credential.ssh_public_key);

        if user_path.exists() {
            return Err(StorageError::AlreadyExists(ConflictError::EmailExists));
        }
        if ssh_path.exists() {
            return Err(StorageError::AlreadyExists(ConflictError::SshKeyExists));
        }

        self.write_record(&user_path, credential)?;

        let record_name = user_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if let Err(e) = self.write_index(&ssh_path, &record_name) {
            // roll back so a failed insert leaves no record
            if let Err(rm) = fs::remove_file(&user_path) {
                warn!(path = %user_path.display(), error = %rm, "failed to roll back record");
            }
            return Err(e);
        }

        debug!(record = %record_name, "stored credential");
        Ok(())
    }

    fn email_exists(&self, encrypted_email: &str) -> Result<bool, StorageError> {
        Ok(self.user_path(encrypted_email).exists())
    }

    fn ssh_key_exists(&self, ssh_public_key: &str) -> Result<bool, StorageError> {
        Ok(self.ssh_path(ssh_public_key).exists())
    }

    fn find_by_email(
        &self,
        encrypted_email: &str,
    ) -> Result<Option<ProtectedCredential>, StorageError> {
        let path = self.user_path(encrypted_email);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    fn count(&self) -> Result<usize, StorageError> {
        let mut n = 0;
        for entry in fs::read_dir(self.root.join(USERS_DIR))? {
            if entry?.path().extension().is_some_and(|ext| ext == "json") {
                n += 1;
            }
        }
        Ok(n)
    }
}
