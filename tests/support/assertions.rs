//! Test assertion helpers.

use std::process::Output;

use super::client::Reply;

/// Assert a hop answered with `status` and `message`.
pub fn assert_reply(reply: &Reply, status: u16, message: &str) {
    assert_eq!(
        (reply.status, reply.body.message.as_str()),
        (status, message),
        "unexpected reply: {:?}",
        reply
    );
    assert_eq!(reply.body.success, (200..300).contains(&status));
}

/// Assert that a command output was successful.
pub fn assert_success(output: &Output) {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("Command failed:\n{}", stderr);
    }
}

/// Assert that a command output failed.
pub fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "Expected command to fail but it succeeded"
    );
}

/// Get stdout as String.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Get stderr as String.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
