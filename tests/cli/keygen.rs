//! Tests for `credhop keygen`.

use std::fs;

use crate::support::*;
use predicates::prelude::*;

#[test]
fn test_keygen_prints_hex_key() {
    let t = Test::new();

    t.cmd()
        .arg("keygen")
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{64}\n$").unwrap());
}

#[test]
fn test_keygen_keys_differ() {
    let t = Test::new();

    let first = stdout(&t.cmd().arg("keygen").output().unwrap());
    let second = stdout(&t.cmd().arg("keygen").output().unwrap());
    assert_ne!(first, second);
}

#[test]
fn test_keygen_writes_private_file() {
    let t = Test::new();
    let path = t.dir.path().join("vault.key");

    t.cmd()
        .args(["keygen", "--output"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("wrote master key"));

    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim().len(), 64);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn test_keygen_refuses_to_overwrite() {
    let t = Test::new();
    let path = t.dir.path().join("vault.key");
    fs::write(&path, "keep me").unwrap();

    t.cmd()
        .args(["keygen", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
}
