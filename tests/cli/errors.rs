//! Tests for error handling and global flags.

use crate::support::*;

#[test]
fn test_help_lists_hops() {
    let t = Test::new();

    let output = t.cmd().arg("--help").output().unwrap();
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("gateway"));
    assert!(out.contains("switch"));
    assert!(out.contains("vault"));
}

#[test]
fn test_unknown_command_fails() {
    let t = Test::new();

    let output = t.cmd().arg("unknown-command").output().unwrap();
    assert_failure(&output);
}

#[test]
fn test_global_flags_accepted_after_subcommand() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["keygen", "--verbose", "--log-format", "json"])
        .output()
        .unwrap();
    assert_success(&output);
}

#[test]
fn test_invalid_log_format_rejected() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["--log-format", "xml", "keygen"])
        .output()
        .unwrap();
    assert_failure(&output);
}
