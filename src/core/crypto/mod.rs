//! Cryptographic operations.
//!
//! Key derivation, deterministic email encryption, password hashing and the
//! [`CredentialProtector`] that combines them at the Vault.
//!
//! ## Layout
//!
//! - `kdf`: HKDF-SHA256 subkeys from the master key
//! - `master_key`: loading, strength screen, generation
//! - `email`: AES-256-GCM with a key-derived fixed nonce (emails only)
//! - `password`: Argon2id with fixed parameters
//! - `protector`: request to [`ProtectedCredential`](crate::core::domain::ProtectedCredential)

pub mod kdf;
pub mod master_key;

mod email;
mod password;
mod protector;

pub use email::{decrypt_email_deterministic, encrypt_email_deterministic};
pub use master_key::{validate_key_strength, KeySource, MasterKey};
pub use password::{generate_salt, hash_password, verify_password};
pub use protector::CredentialProtector;
