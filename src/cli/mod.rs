//! Command-line interface.

pub mod completions;
pub mod hop;
pub mod keygen;
pub mod output;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::constants::CONFIG_ENV;
use crate::core::types::Role;

/// Credhop - a three-hop mTLS registration pipeline.
#[derive(Parser)]
#[command(
    name = "credhop",
    about = "Registration gateway, security switch, and credential vault over mutual TLS",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Run the public entry point (port 8443 by default)
    Gateway(HopArgs),

    /// Run the middle hop that admits only the gateway (port 8444)
    Switch(HopArgs),

    /// Run the credential vault that admits only the switch (port 8445)
    Vault(HopArgs),

    /// Generate a random master key for the vault
    Keygen {
        /// Write the key to this file (mode 600) instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing key file
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by the three hop commands.
#[derive(Args, Debug, Clone, Default)]
pub struct HopArgs {
    /// TOML configuration file
    #[arg(short, long, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Address to listen on (e.g. 0.0.0.0:8443)
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// Address of the next hop (host:port)
    #[arg(short, long)]
    pub upstream: Option<String>,
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Log output formats.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Execute a command.
pub fn execute(command: Command) -> crate::error::Result<()> {
    use Command::*;

    match command {
        Gateway(args) => hop::execute(Role::Gateway, args),
        Switch(args) => hop::execute(Role::Switch, args),
        Vault(args) => hop::execute(Role::Vault, args),
        Keygen { output, force } => keygen::execute(output.as_deref(), force),
        Completions { shell } => completions::execute(shell),
    }
}
