//! Gateway, switch, and vault commands.
//!
//! All three run the same server; the role decides whether validated
//! requests are forwarded or stored.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::{output, HopArgs};
use crate::core::config::{HopConfig, Overrides};
use crate::core::crypto::{master_key, CredentialProtector, KeySource};
use crate::core::forward::HopForwarder;
use crate::core::identity::IdentityVerifier;
use crate::core::pipeline::{Downstream, PipelineOrchestrator};
use crate::core::server::HopServer;
use crate::core::types::Role;
use crate::core::{store, tls};
use crate::error::{ConfigError, Result};

/// Load configuration for `role` and serve until interrupted.
pub fn execute(role: Role, args: HopArgs) -> Result<()> {
    let overrides = Overrides {
        listen: args.listen,
        upstream: args.upstream,
    };
    let config = HopConfig::load(role, args.config.as_deref(), overrides)?;
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

/// Bind the hop described by `config` and serve until ctrl-c.
pub async fn run(config: HopConfig) -> Result<()> {
    let server = bind(&config).await?;
    let addr = server.local_addr()?;

    output::success(&format!("{} ready", config.role));
    output::kv("listen", addr);
    if let Some(upstream) = &config.upstream {
        output::kv("upstream", &upstream.address);
    }

    server.serve(shutdown_signal()).await?;
    Ok(())
}

/// Assemble the pipeline and bind the listener without serving yet.
pub async fn bind(config: &HopConfig) -> Result<HopServer> {
    let tls = tls::server_config(
        &config.tls.server_cert,
        &config.tls.server_key,
        &config.tls.ca_cert,
        config.requires_client_cert(),
    )?;
    let orchestrator = Arc::new(orchestrator(config)?);
    Ok(HopServer::bind(config.listen, tls, orchestrator).await?)
}

/// Build the request pipeline for `config.role`.
pub fn orchestrator(config: &HopConfig) -> Result<PipelineOrchestrator> {
    let verifier = IdentityVerifier::new(config.role, config.access_policy());
    let downstream = match config.upstream_target() {
        Some(target) => {
            let client = tls::client_config(
                &config.tls.client_cert,
                &config.tls.client_key,
                &config.tls.ca_cert,
                target.organization.as_deref(),
            )?;
            let forwarder = HopForwarder::new(target, client)?;
            info!(hop = %config.role, url = %forwarder.url(), "forwarding enabled");
            Downstream::Forward(Arc::new(forwarder))
        }
        None if config.role == Role::Vault => {
            let (key, source) = master_key::load(config.vault.master_key_file.as_deref())?;
            info!(source = %source, "master key loaded");
            if source == KeySource::Development {
                output::warn(
                    "using an ephemeral master key; stored records are unreadable after restart",
                );
            }
            if config.vault.store_dir.is_none() {
                output::warn("no store_dir configured; records are kept in memory only");
            }
            Downstream::Store {
                protector: CredentialProtector::new(key),
                store: store::open(config.vault.store_dir.as_deref())?,
            }
        }
        None => return Err(ConfigError::MissingSection("upstream").into()),
    };

    Ok(PipelineOrchestrator::new(config.role, verifier, downstream))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
