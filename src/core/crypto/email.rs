//! Deterministic email encryption.
//!
//! Equal emails encrypt to byte-identical ciphertext under one master key,
//! which is what lets the Vault detect duplicates without decrypting stored
//! records. The nonce is derived from the master key and never changes, so
//! this key/nonce pair must only ever seal email addresses. Nothing outside
//! this module may use [`email_cipher`].

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::kdf;
use super::master_key::MasterKey;
use crate::core::constants::{EMAIL_KEY_CONTEXT, EMAIL_NONCE_CONTEXT, MASTER_KEY_LEN, NONCE_LEN};
use crate::core::types::EncryptedEmail;
use crate::error::CryptoError;

fn email_cipher(master: &MasterKey) -> Result<(Aes256Gcm, [u8; NONCE_LEN]), CryptoError> {
    let key = kdf::derive_array::<MASTER_KEY_LEN>(master.as_bytes(), EMAIL_KEY_CONTEXT)?;
    let nonce = kdf::derive_array::<NONCE_LEN>(master.as_bytes(), EMAIL_NONCE_CONTEXT)?;

    let cipher = Aes256Gcm::new_from_slice(&*key)
        .map_err(|e| CryptoError::Encryption(format!("cipher init failed: {}", e)))?;
    Ok((cipher, *nonce))
}

/// Seal an email address; base64 of ciphertext plus tag, no associated data.
pub fn encrypt_email_deterministic(
    email: &str,
    master: &MasterKey,
) -> Result<EncryptedEmail, CryptoError> {
    let (cipher, nonce) = email_cipher(master)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), email.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(STANDARD.encode(ciphertext))
}

/// Open a value produced by [`encrypt_email_deterministic`].
///
/// Fails with [`CryptoError::Decryption`] when the ciphertext was modified
/// or sealed under another master key.
pub fn decrypt_email_deterministic(
    encrypted: &str,
    master: &MasterKey,
) -> Result<String, CryptoError> {
    let ciphertext = STANDARD
        .decode(encrypted)
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;
    let (cipher, nonce) = email_cipher(master)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
        .map_err(|_| CryptoError::Decryption)?;
    String::from_utf8(plaintext).map_err(|e| CryptoError::Encoding(e.to_string()))
}
