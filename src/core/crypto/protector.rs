//! Credential protection at the Vault.

use crate::core::domain::ProtectedCredential;
use crate::core::types::{EncryptedEmail, RegistrationRequest};
use crate::error::CryptoError;

use super::email::{decrypt_email_deterministic, encrypt_email_deterministic};
use super::master_key::MasterKey;
use super::password::{generate_salt, hash_password, verify_password};

/// Owns the master key and turns validated requests into storable records.
///
/// Read-only after construction; clone it into each request.
#[derive(Debug, Clone)]
pub struct CredentialProtector {
    master: MasterKey,
}

impl CredentialProtector {
    pub fn new(master: MasterKey) -> Self {
        Self { master }
    }

    /// Lookup key for duplicate checks, without hashing the password.
    pub fn email_lookup_key(&self, email: &str) -> Result<EncryptedEmail, CryptoError> {
        encrypt_email_deterministic(email, &self.master)
    }

    /// Encrypt the email, hash the password under a fresh salt, and stamp
    /// the record. CPU and memory heavy; run it off the async executor.
    pub fn protect(&self, request: &RegistrationRequest) -> Result<ProtectedCredential, CryptoError> {
        let encrypted_email = encrypt_email_deterministic(&request.email, &self.master)?;
        let salt = generate_salt()?;
        let hash = hash_password(&request.password, &salt)?;

        Ok(ProtectedCredential::new(
            encrypted_email,
            hash,
            salt,
            request.ssh_public_key.as_str(),
        ))
    }

    pub fn reveal_email(&self, credential: &ProtectedCredential) -> Result<String, CryptoError> {
        decrypt_email_deterministic(&credential.encrypted_email, &self.master)
    }

    pub fn verify(&self, password: &str, credential: &ProtectedCredential) -> Result<bool, CryptoError> {
        verify_password(password, &credential.password_hash, &credential.password_salt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protector() -> CredentialProtector {
        CredentialProtector::new(MasterKey::generate().unwrap())
    }

    fn request() -> RegistrationRequest {
        RegistrationRequest::new(
            "a@b.com",
            "Abcdef1!",
            "  ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8g\n",
        )
    }

    #[test]
    fn test_protect_keeps_key_verbatim() {
        let p = protector();
        let record = p.protect(&request()).unwrap();

        assert!(!record.encrypted_email.is_empty());
        assert_ne!(record.encrypted_email, "a@b.com");
        assert_ne!(record.password_hash, record.password_salt);
        assert_eq!(record.ssh_public_key, request().ssh_public_key);
        assert_eq!(record.encrypted_email, p.email_lookup_key("a@b.com").unwrap());
    }

    #[test]
    fn test_reveal_and_verify() {
        let p = protector();
        let record = p.protect(&request()).unwrap();
        assert_eq!(p.reveal_email(&record).unwrap(), "a@b.com");
        assert!(p.verify("Abcdef1!", &record).unwrap());
        assert!(!p.verify("Abcdef1?", &record).unwrap());
    }

    #[test]
    fn test_fresh_salt_per_record() {
        let p = protector();
        let a = p.protect(&request()).unwrap();
        let b = p.protect(&request()).unwrap();
        assert_eq!(a.encrypted_email, b.encrypted_email);
        assert_ne!(a.password_salt, b.password_salt);
        assert_ne!(a.password_hash, b.password_hash);
    }
}
