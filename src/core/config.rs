//! Hop configuration.
//!
//! A [`HopConfig`] is assembled once at startup from three layers: the
//! per-role defaults, an optional TOML file, and command-line overrides.
//! Every field in the file is optional; anything left out keeps its default.
//!
//! ```toml
//! listen = "0.0.0.0:8444"
//!
//! [tls]
//! server_cert = "certificates/security-switch/server.crt"
//! ca_cert = "certificates/ca/ca.crt"
//!
//! [inbound]
//! allowed_organization = "EntryHub"   # "*" accepts any client
//!
//! [upstream]
//! address = "10.0.0.7:8445"
//! server_name = "database-vault"
//! timeout_secs = 10
//!
//! [vault]
//! master_key_file = "/etc/credhop/master.key"
//! store_dir = "/var/lib/credhop"
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::core::constants::{
    CERT_DIR, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, ENVIRONMENT_ENV, MASTER_KEY_ENV,
};
use crate::core::crypto::master_key;
use crate::core::forward::UpstreamTarget;
use crate::core::identity::AccessPolicy;
use crate::core::types::Role;
use crate::error::{ConfigError, Result};

/// Value of `allowed_organization` that opens a hop to any TLS client.
const ANY_ORGANIZATION: &str = "*";

/// Fully resolved configuration for one hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopConfig {
    pub role: Role,
    pub listen: SocketAddr,
    pub tls: TlsPaths,
    /// Organization the caller's certificate must carry; `None` admits any
    /// TLS client.
    pub allowed_organization: Option<String>,
    pub upstream: Option<UpstreamConfig>,
    pub vault: VaultConfig,
}

/// Certificate and key files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub server_cert: PathBuf,
    pub server_key: PathBuf,
    pub ca_cert: PathBuf,
    /// Presented to the next hop.
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

/// Where and how to reach the next hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub address: String,
    pub server_name: String,
    pub organization: Option<String>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

/// Vault-only settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultConfig {
    pub master_key_file: Option<PathBuf>,
    /// Filesystem store root; the in-memory store is used when unset.
    pub store_dir: Option<PathBuf>,
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<SocketAddr>,
    pub upstream: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    listen: Option<SocketAddr>,
    #[serde(default)]
    tls: TlsFile,
    #[serde(default)]
    inbound: InboundFile,
    upstream: Option<UpstreamFile>,
    #[serde(default)]
    vault: VaultFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TlsFile {
    server_cert: Option<PathBuf>,
    server_key: Option<PathBuf>,
    ca_cert: Option<PathBuf>,
    client_cert: Option<PathBuf>,
    client_key: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InboundFile {
    allowed_organization: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpstreamFile {
    address: Option<String>,
    server_name: Option<String>,
    organization: Option<String>,
    timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct VaultFile {
    master_key_file: Option<PathBuf>,
    store_dir: Option<PathBuf>,
}

impl TlsPaths {
    /// `certificates/<server-name>/{server,client}.{crt,key}` plus the shared CA.
    pub fn for_role(role: Role) -> Self {
        let dir = Path::new(CERT_DIR).join(role.server_name());
        Self {
            server_cert: dir.join("server.crt"),
            server_key: dir.join("server.key"),
            ca_cert: Path::new(CERT_DIR).join("ca").join("ca.crt"),
            client_cert: dir.join("client.crt"),
            client_key: dir.join("client.key"),
        }
    }
}

impl UpstreamConfig {
    /// Loopback address of `next` on its default port.
    pub fn for_role(next: Role) -> Self {
        Self {
            address: format!("127.0.0.1:{}", next.default_port()),
            server_name: next.server_name().to_string(),
            organization: Some(next.organization().to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl HopConfig {
    /// Defaults matching the stock three-hop deployment on one machine.
    pub fn defaults(role: Role) -> Self {
        Self {
            role,
            listen: SocketAddr::from(([0, 0, 0, 0], role.default_port())),
            tls: TlsPaths::for_role(role),
            allowed_organization: role.predecessor().map(|r| r.organization().to_string()),
            upstream: role.successor().map(UpstreamConfig::for_role),
            vault: VaultConfig::default(),
        }
    }

    /// Build the configuration for `role`, reading `path` when given.
    pub fn load(role: Role, path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                if !path.exists() {
                    return Err(ConfigError::MissingFile(path.display().to_string()).into());
                }
                let contents = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
                Self::from_toml(role, &contents)?
            }
            None => Self::defaults(role),
        };

        config.apply(overrides);
        Ok(config)
    }

    /// Layer a TOML document over the defaults for `role`.
    pub fn from_toml(role: Role, contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(ConfigError::Parse)?;
        let mut config = Self::defaults(role);

        if let Some(listen) = file.listen {
            config.listen = listen;
        }

        let tls = &mut config.tls;
        merge(&mut tls.server_cert, file.tls.server_cert);
        merge(&mut tls.server_key, file.tls.server_key);
        merge(&mut tls.ca_cert, file.tls.ca_cert);
        merge(&mut tls.client_cert, file.tls.client_cert);
        merge(&mut tls.client_key, file.tls.client_key);

        if let Some(org) = file.inbound.allowed_organization {
            config.allowed_organization = (org != ANY_ORGANIZATION).then_some(org);
        }

        if let Some(section) = file.upstream {
            let mut upstream = config.upstream.take().unwrap_or_else(|| UpstreamConfig {
                address: String::new(),
                server_name: String::new(),
                organization: None,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            });
            merge(&mut upstream.address, section.address);
            merge(&mut upstream.server_name, section.server_name);
            if let Some(org) = section.organization {
                upstream.organization = (org != ANY_ORGANIZATION).then_some(org);
            }
            merge(&mut upstream.timeout_secs, section.timeout_secs);
            merge(&mut upstream.connect_timeout_secs, section.connect_timeout_secs);
            config.upstream = Some(upstream);
        }

        config.vault = VaultConfig {
            master_key_file: file.vault.master_key_file,
            store_dir: file.vault.store_dir,
        };

        Ok(config)
    }

    fn apply(&mut self, overrides: Overrides) {
        if let Some(listen) = overrides.listen {
            self.listen = listen;
        }
        if let Some(address) = overrides.upstream {
            match &mut self.upstream {
                Some(upstream) => upstream.address = address,
                None => {
                    debug!(hop = %self.role, "ignoring upstream override for terminal hop");
                }
            }
        }
    }

    /// Validate the configuration before anything is bound or loaded.
    pub fn validate(&self) -> Result<()> {
        debug!(hop = %self.role, "validating config");

        require_file(&self.tls.server_cert)?;
        require_file(&self.tls.server_key)?;
        require_file(&self.tls.ca_cert)?;

        if self.role.successor().is_some() {
            let upstream = self
                .upstream
                .as_ref()
                .ok_or(ConfigError::MissingSection("upstream"))?;
            require_file(&self.tls.client_cert)?;
            require_file(&self.tls.client_key)?;

            if upstream.address.trim().is_empty() {
                return Err(invalid("upstream.address", "must not be empty"));
            }
            if upstream.server_name.trim().is_empty() {
                return Err(invalid("upstream.server_name", "must not be empty"));
            }
            if upstream.timeout_secs == 0 {
                return Err(invalid("upstream.timeout_secs", "must be at least 1"));
            }
            if upstream.connect_timeout_secs == 0 {
                return Err(invalid("upstream.connect_timeout_secs", "must be at least 1"));
            }
        }

        if self.role == Role::Vault {
            match &self.vault.master_key_file {
                Some(path) => require_file(path)?,
                None if has_env_key() || is_dev_environment() => {}
                None => return Err(ConfigError::MissingMasterKey.into()),
            }
        }

        Ok(())
    }

    /// Inbound policy derived from `allowed_organization`.
    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::from_option(self.allowed_organization.clone())
    }

    /// Whether inbound TLS must carry a client certificate.
    pub fn requires_client_cert(&self) -> bool {
        self.allowed_organization.is_some()
    }

    /// Forwarding target, when this hop has a successor.
    pub fn upstream_target(&self) -> Option<UpstreamTarget> {
        let next = self.role.successor()?;
        let upstream = self.upstream.as_ref()?;
        Some(UpstreamTarget {
            role: next,
            address: upstream.address.clone(),
            server_name: upstream.server_name.clone(),
            organization: upstream.organization.clone(),
            timeout: Duration::from_secs(upstream.timeout_secs),
            connect_timeout: Duration::from_secs(upstream.connect_timeout_secs),
        })
    }
}

fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::MissingFile(path.display().to_string()).into())
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

fn has_env_key() -> bool {
    std::env::var(MASTER_KEY_ENV).is_ok_and(|v| !v.trim().is_empty())
}

fn is_dev_environment() -> bool {
    std::env::var(ENVIRONMENT_ENV).is_ok_and(|v| master_key::is_development(&v))
}
