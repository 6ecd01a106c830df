//! Credhop - a three-hop mTLS registration pipeline.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use credhop::cli::output;
use credhop::cli::{execute, Cli, LogFormat};
use credhop::core::constants::LOG_ENV;
use credhop::error::{ConfigError, Error};

fn main() {
    let cli = Cli::parse();

    // CREDHOP_LOG wins over --verbose; audit events use their own target
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("credhop=debug,audit=info")
        } else {
            EnvFilter::new("credhop=info,audit=info")
        }
    });

    match cli.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    if let Err(e) = execute(cli.command) {
        let suggestion = match &e {
            Error::Config(ConfigError::MissingMasterKey) => {
                Some("run: credhop keygen --output master.key, then set [vault] master_key_file")
            }
            Error::Config(ConfigError::MissingFile(_)) => {
                Some("check the [tls] paths, or pass --config with your certificate layout")
            }
            Error::Config(ConfigError::Parse(_)) => Some("fix the TOML syntax in your config file"),
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
