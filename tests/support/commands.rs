//! Command helpers for running the credhop binary.

use super::Test;
use assert_cmd::Command;

impl Test {
    /// A credhop command running inside the test directory with a clean
    /// credhop environment.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("credhop").expect("failed to find credhop binary");
        cmd.current_dir(self.dir.path())
            .env_remove("CREDHOP_CONFIG")
            .env_remove("CREDHOP_MASTER_KEY")
            .env_remove("CREDHOP_ENV")
            .env_remove("CREDHOP_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}
