//! Startup failures for the hop commands.
//!
//! Each of these must exit before binding a port, except the development
//! vault, which starts and is killed after its startup warnings.

use std::fs;
use std::time::Duration;

use crate::support::*;
use predicates::prelude::*;

#[test]
fn test_gateway_without_certificates() {
    let t = Test::new();
    fs::remove_dir_all(&t.pki.root).unwrap();

    t.cmd()
        .args(["gateway", "--listen", "127.0.0.1:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found"))
        .stderr(predicate::str::contains("server.crt"));
}

#[test]
fn test_missing_config_file() {
    let t = Test::new();

    t.cmd()
        .args(["switch", "--config", "absent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn test_config_file_from_environment() {
    let t = Test::new();
    fs::write(t.dir.path().join("broken.toml"), "listen = [").unwrap();

    t.cmd()
        .arg("gateway")
        .env("CREDHOP_CONFIG", "broken.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}

#[test]
fn test_vault_without_master_key() {
    let t = Test::new();

    // default certificate layout exists in the test dir; no key configured
    t.cmd()
        .args(["vault", "--listen", "127.0.0.1:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("credhop keygen"));
}

#[test]
fn test_development_vault_warns_about_ephemeral_key() {
    let t = Test::new();

    t.cmd()
        .args(["vault", "--listen", "127.0.0.1:0"])
        .env("CREDHOP_ENV", "development")
        .timeout(Duration::from_secs(5))
        .assert()
        .stderr(predicate::str::contains(
            "⚠ using an ephemeral master key; stored records are unreadable after restart",
        ))
        .stderr(predicate::str::contains(
            "⚠ no store_dir configured; records are kept in memory only",
        ))
        .stderr(predicate::str::contains("vault ready"));
}

#[test]
fn test_vault_rejects_readable_key_file() {
    let t = Test::new();
    let key = t.master_key_path();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&key, fs::Permissions::from_mode(0o644)).unwrap();

        let config = t.dir.path().join("vault.toml");
        fs::write(
            &config,
            format!(
                "listen = \"127.0.0.1:0\"\n\n[vault]\nmaster_key_file = \"{}\"\n",
                key.display()
            ),
        )
        .unwrap();

        t.cmd()
            .args(["vault", "--config"])
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("chmod 600"));
    }
}
