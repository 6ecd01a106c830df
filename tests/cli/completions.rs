//! Tests for `credhop completions`.

use crate::support::*;
use predicates::prelude::*;

#[test]
fn test_completions_for_each_shell() {
    let t = Test::new();

    for shell in ["bash", "zsh", "fish", "power-shell"] {
        t.cmd()
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::contains("credhop"));
    }
}

#[test]
fn test_completions_list_hop_commands() {
    let t = Test::new();

    let output = t.cmd().args(["completions", "bash"]).output().unwrap();
    assert_success(&output);
    let script = stdout(&output);
    for command in ["gateway", "switch", "vault", "keygen"] {
        assert!(script.contains(command), "missing {command}");
    }
}
