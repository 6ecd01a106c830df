//! Test support for credhop integration tests.
//!
//! Every test gets its own temp directory holding a fresh PKI, a master key
//! file, and the vault's store. Hops bind to `127.0.0.1:0`, so tests run in
//! parallel without port clashes.

#![allow(dead_code)]

pub mod assertions;
pub mod client;
pub mod commands;
pub mod fixtures;
pub mod pki;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use client::HopClient;
#[allow(unused_imports)]
pub use fixtures::*;

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use credhop::cli::hop;
use credhop::core::config::{HopConfig, TlsPaths, VaultConfig};
use credhop::core::crypto::master_key::read_key_file;
use credhop::core::crypto::{CredentialProtector, MasterKey};
use credhop::core::store::{CredentialStore, Filesystem};
use credhop::core::types::Role;
use tempfile::TempDir;

use pki::Pki;

/// Isolated environment for one test.
pub struct Test {
    pub dir: TempDir,
    pub pki: Pki,
}

/// Addresses of a running three-hop chain.
#[derive(Debug, Clone, Copy)]
pub struct Chain {
    pub gateway: SocketAddr,
    pub switch: SocketAddr,
    pub vault: SocketAddr,
}

impl Test {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let pki = Pki::generate(dir.path());

        let key = MasterKey::generate().expect("generate master key");
        let key_path = dir.path().join("master.key");
        fs::write(&key_path, key.to_hex().as_bytes()).expect("write master key");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&key_path, fs::Permissions::from_mode(0o600))
                .expect("chmod master key");
        }

        Self { dir, pki }
    }

    pub fn master_key_path(&self) -> PathBuf {
        self.dir.path().join("master.key")
    }

    pub fn store_dir(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    /// Default config for `role`, pointed at this test's files and an
    /// ephemeral port.
    pub fn config(&self, role: Role) -> HopConfig {
        let mut config = HopConfig::defaults(role);
        config.listen = "127.0.0.1:0".parse().expect("loopback address");
        config.tls = TlsPaths {
            server_cert: self.pki.server_cert(role),
            server_key: self.pki.server_key(role),
            ca_cert: self.pki.ca(),
            client_cert: self.pki.client_cert(role),
            client_key: self.pki.client_key(role),
        };
        if role == Role::Vault {
            config.vault = VaultConfig {
                master_key_file: Some(self.master_key_path()),
                store_dir: Some(self.store_dir()),
            };
        }
        config
    }

    /// Vault, then Switch, then Gateway, each pointed at the one after it.
    pub async fn chain(&self) -> Chain {
        let vault = start(&self.config(Role::Vault)).await;

        let mut switch = self.config(Role::Switch);
        set_upstream(&mut switch, vault);
        let switch = start(&switch).await;

        let mut gateway = self.config(Role::Gateway);
        set_upstream(&mut gateway, switch);
        let gateway = start(&gateway).await;

        Chain {
            gateway,
            switch,
            vault,
        }
    }

    /// Open the vault's store from disk.
    pub fn store(&self) -> Filesystem {
        Filesystem::open(&self.store_dir()).expect("open store")
    }

    pub fn stored_count(&self) -> usize {
        if !self.store_dir().exists() {
            return 0;
        }
        self.store().count().expect("count records")
    }

    pub fn protector(&self) -> CredentialProtector {
        CredentialProtector::new(read_key_file(&self.master_key_path()).expect("read master key"))
    }

    /// Client for `target`, presenting `identity`'s client certificate.
    pub fn client(&self, target: Role, addr: SocketAddr, identity: Option<Role>) -> HopClient {
        let certs = identity.map(|role| (self.pki.client_cert(role), self.pki.client_key(role)));
        HopClient::new(&self.pki.ca(), target, addr, certs)
    }
}

pub fn set_upstream(config: &mut HopConfig, addr: SocketAddr) {
    if let Some(upstream) = config.upstream.as_mut() {
        upstream.address = addr.to_string();
    }
}

/// Bind a hop and serve it on the test runtime.
pub async fn start(config: &HopConfig) -> SocketAddr {
    let server = hop::bind(config).await.expect("bind hop");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.serve(std::future::pending::<()>()));
    addr
}
