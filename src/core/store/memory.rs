//! In-memory credential store.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::CredentialStore;
use crate::core::domain::ProtectedCredential;
use crate::core::ssh::canonical_key;
use crate::error::{ConflictError, StorageError};

#[derive(Default)]
struct Inner {
    by_email: HashMap<String, ProtectedCredential>,
    ssh_keys: HashSet<String>,
}

/// Mutex-guarded maps. Used when no store directory is configured, and in
/// tests.
#[derive(Default)]
pub struct Memory {
    inner: Mutex<Inner>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))
    }
}

impl CredentialStore for Memory {
    fn store_credential(&self, credential: &ProtectedCredential) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let key = canonical_key(&credential.ssh_public_key);

        if inner.by_email.contains_key(&credential.encrypted_email) {
            return Err(StorageError::AlreadyExists(ConflictError::EmailExists));
        }
        if inner.ssh_keys.contains(&key) {
            return Err(StorageError::AlreadyExists(ConflictError::SshKeyExists));
        }

        inner.ssh_keys.insert(key);
        inner
            .by_email
            .insert(credential.encrypted_email.clone(), credential.clone());
        Ok(())
    }

    fn email_exists(&self, encrypted_email: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.by_email.contains_key(encrypted_email))
    }

    fn ssh_key_exists(&self, ssh_public_key: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.ssh_keys.contains(&canonical_key(ssh_public_key)))
    }

    fn find_by_email(
        &self,
        encrypted_email: &str,
    ) -> Result<Option<ProtectedCredential>, StorageError> {
        Ok(self.lock()?.by_email.get(encrypted_email).cloned())
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.by_email.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, key: &str) -> ProtectedCredential {
        ProtectedCredential::new(email.into(), "ab".repeat(32), "cd".repeat(16), key)
    }

    #[test]
    fn test_store_and_lookup() {
        let store = Memory::new();
        store.store_credential(&record("e1", "ssh-ed25519 K1")).unwrap();

        assert!(store.email_exists("e1").unwrap());
        assert!(store.ssh_key_exists("  ssh-ed25519 K1 ").unwrap());
        assert!(!store.email_exists("e2").unwrap());
        assert_eq!(store.find_by_email("e1").unwrap().unwrap().ssh_public_key, "ssh-ed25519 K1");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_duplicates_rejected_without_partial_state() {
        let store = Memory::new();
        store.store_credential(&record("e1", "ssh-ed25519 K1")).unwrap();

        let err = store.store_credential(&record("e1", "ssh-ed25519 K2")).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(ConflictError::EmailExists)));
        assert!(!store.ssh_key_exists("ssh-ed25519 K2").unwrap());

        let err = store.store_credential(&record("e2", "ssh-ed25519 K1")).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(ConflictError::SshKeyExists)));
        assert!(!store.email_exists("e2").unwrap());

        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_same_key_with_new_comment_is_duplicate() {
        let store = Memory::new();
        store.store_credential(&record("e1", "ssh-ed25519 K1 alice@work")).unwrap();

        assert!(store.ssh_key_exists("ssh-ed25519 K1 alice@home").unwrap());
        let err = store
            .store_credential(&record("e2", "ssh-ed25519 K1 alice@home"))
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(ConflictError::SshKeyExists)));
        assert_eq!(
            store.find_by_email("e1").unwrap().unwrap().ssh_public_key,
            "ssh-ed25519 K1 alice@work"
        );
    }
}
