//! Wire types and semantic aliases shared by every hop.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Base64 AES-256-GCM ciphertext of an email address.
pub type EncryptedEmail = String;

/// Hex-encoded Argon2id output.
pub type PasswordHash = String;

/// Hex-encoded 16-byte random salt.
pub type PasswordSalt = String;

/// A checkpoint role in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Gateway,
    Switch,
    Vault,
}

impl Role {
    /// Lowercase role name used in logs and file layout.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Gateway => "gateway",
            Role::Switch => "switch",
            Role::Vault => "vault",
        }
    }

    /// Organization name carried in this role's certificates.
    pub fn organization(&self) -> &'static str {
        match self {
            Role::Gateway => "EntryHub",
            Role::Switch => "SecuritySwitch",
            Role::Vault => "DatabaseVault",
        }
    }

    /// DNS name this role's server certificate is issued for.
    pub fn server_name(&self) -> &'static str {
        match self {
            Role::Gateway => "entry-hub",
            Role::Switch => "security-switch",
            Role::Vault => "database-vault",
        }
    }

    /// Hop that calls this one, if any.
    pub fn predecessor(&self) -> Option<Role> {
        match self {
            Role::Gateway => None,
            Role::Switch => Some(Role::Gateway),
            Role::Vault => Some(Role::Switch),
        }
    }

    /// Hop this one forwards to, if any.
    pub fn successor(&self) -> Option<Role> {
        match self {
            Role::Gateway => Some(Role::Switch),
            Role::Switch => Some(Role::Vault),
            Role::Vault => None,
        }
    }

    /// Inbound endpoint this role accepts registrations on.
    pub fn intake_path(&self) -> &'static str {
        match self {
            Role::Gateway | Role::Switch => crate::core::constants::REGISTER_PATH,
            Role::Vault => crate::core::constants::STORE_PATH,
        }
    }

    /// Default listen port from the original deployment.
    pub fn default_port(&self) -> u16 {
        match self {
            Role::Gateway => 8443,
            Role::Switch => 8444,
            Role::Vault => 8445,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registration payload accepted by every hop.
///
/// The password and email are wiped from memory when the request drops, and
/// `Debug` never prints them.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub ssh_public_key: String,
}

impl RegistrationRequest {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        ssh_public_key: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ssh_public_key: ssh_public_key.into(),
        }
    }
}

impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("email", &"<redacted>")
            .field("password", &"<redacted>")
            .field("ssh_public_key_len", &self.ssh_public_key.len())
            .finish()
    }
}

/// JSON body every hop answers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
