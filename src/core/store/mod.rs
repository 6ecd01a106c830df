//! Credential persistence.
//!
//! The Vault writes [`ProtectedCredential`] records through the
//! [`CredentialStore`] trait. Two backends ship with the crate:
//!
//! - [`Memory`]: mutex-guarded maps, lost on restart
//! - [`Filesystem`]: one JSON file per record plus an SSH key index
//!
//! ## Adding a New Backend
//!
//! 1. Implement `CredentialStore`
//! 2. Make `store_credential` check and insert atomically
//! 3. Select it in [`open`]

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::core::domain::ProtectedCredential;
use crate::error::StorageError;

mod fs;
mod memory;

pub use fs::Filesystem;
pub use memory::Memory;

/// Storage contract the Vault relies on.
pub trait CredentialStore: Send + Sync {
    /// Insert a new record.
    ///
    /// Must fail with `AlreadyExists` instead of overwriting when the
    /// encrypted email or the SSH key is already present, and must leave
    /// nothing behind when it fails.
    fn store_credential(&self, credential: &ProtectedCredential) -> Result<(), StorageError>;

    /// Whether a record with this deterministic ciphertext exists.
    fn email_exists(&self, encrypted_email: &str) -> Result<bool, StorageError>;

    /// Whether any record uses this SSH key. Keys compare by algorithm and
    /// key data only; see [`crate::core::ssh::canonical_key`].
    fn ssh_key_exists(&self, ssh_public_key: &str) -> Result<bool, StorageError>;

    /// Look a record up by its encrypted email.
    fn find_by_email(&self, encrypted_email: &str)
        -> Result<Option<ProtectedCredential>, StorageError>;

    /// Number of stored records.
    fn count(&self) -> Result<usize, StorageError>;
}

/// Pick a backend: filesystem when a directory is configured, memory otherwise.
pub fn open(store_dir: Option<&Path>) -> Result<Arc<dyn CredentialStore>, StorageError> {
    match store_dir {
        Some(dir) => {
            info!(path = %dir.display(), "using filesystem credential store");
            Ok(Arc::new(Filesystem::open(dir)?))
        }
        None => {
            info!("using in-memory credential store; records are lost on restart");
            Ok(Arc::new(Memory::new()))
        }
    }
}
