//! Protected credential record.
//!
//! The only shape in which registration data is ever stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{EncryptedEmail, PasswordHash, PasswordSalt};

/// Storage-safe form of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedCredential {
    /// Deterministic ciphertext; equal emails give equal values.
    pub encrypted_email: EncryptedEmail,
    pub password_hash: PasswordHash,
    pub password_salt: PasswordSalt,
    /// Stored verbatim, trimmed.
    pub ssh_public_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProtectedCredential {
    /// New record stamped with the current time.
    pub fn new(
        encrypted_email: EncryptedEmail,
        password_hash: PasswordHash,
        password_salt: PasswordSalt,
        ssh_public_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            encrypted_email,
            password_hash,
            password_salt,
            ssh_public_key: ssh_public_key.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
