//! Password hashing and verification using Argon2id.
//!
//! Parameters are fixed (see `constants`): stored hashes can only be checked
//! with exactly the parameters that produced them.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::core::constants::{
    ARGON2_ITERATIONS, ARGON2_LANES, ARGON2_MEMORY_KIB, ARGON2_OUTPUT_LEN, SALT_LEN,
};
use crate::core::types::{PasswordHash, PasswordSalt};
use crate::error::CryptoError;

/// 16 random bytes, hex-encoded.
pub fn generate_salt() -> Result<PasswordSalt, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::Rng(e.to_string()))?;
    Ok(hex::encode(salt))
}

fn hasher() -> Result<Argon2<'static>, CryptoError> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_LANES,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|e| CryptoError::Hashing(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash `password` with `salt`, hex-encoded.
///
/// The salt's hex text (not its decoded bytes) is the Argon2 salt input, so
/// hashes match records written by earlier deployments.
pub fn hash_password(password: &str, salt: &str) -> Result<PasswordHash, CryptoError> {
    let raw = derive_hash(password, salt)?;
    Ok(hex::encode(&*raw))
}

fn derive_hash(
    password: &str,
    salt: &str,
) -> Result<Zeroizing<[u8; ARGON2_OUTPUT_LEN]>, CryptoError> {
    let mut out = Zeroizing::new([0u8; ARGON2_OUTPUT_LEN]);
    hasher()?
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut *out)
        .map_err(|e| CryptoError::Hashing(e.to_string()))?;
    Ok(out)
}

/// Recompute and compare in constant time.
///
/// A stored hash that is not valid hex, or not 32 bytes, never matches.
pub fn verify_password(password: &str, stored_hash: &str, stored_salt: &str) -> Result<bool, CryptoError> {
    let expected = match hex::decode(stored_hash) {
        Ok(bytes) if bytes.len() == ARGON2_OUTPUT_LEN => bytes,
        _ => return Ok(false),
    };
    let actual = derive_hash(password, stored_salt)?;
    Ok(bool::from(actual.as_slice().ct_eq(expected.as_slice())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_shape() {
        let salt = generate_salt().unwrap();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(salt, generate_salt().unwrap());
    }

    #[test]
    fn test_hash_and_verify() {
        let salt = generate_salt().unwrap();
        let hash = hash_password("Tr0ub4dor&3", &salt).unwrap();

        assert_eq!(hash.len(), ARGON2_OUTPUT_LEN * 2);
        assert_ne!(hash, salt);
        assert!(verify_password("Tr0ub4dor&3", &hash, &salt).unwrap());
        assert!(!verify_password("Tr0ub4dor&4", &hash, &salt).unwrap());
    }

    #[test]
    fn test_same_password_same_salt_same_hash() {
        let salt = "00112233445566778899aabbccddeeff";
        assert_eq!(
            hash_password("Abcdef1!", salt).unwrap(),
            hash_password("Abcdef1!", salt).unwrap()
        );
    }

    #[test]
    fn test_different_salts() {
        let a = hash_password("Abcdef1!", &generate_salt().unwrap()).unwrap();
        let b = hash_password("Abcdef1!", &generate_salt().unwrap()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_stored_hash_never_matches() {
        let salt = generate_salt().unwrap();
        assert!(!verify_password("Abcdef1!", "not-hex", &salt).unwrap());
        assert!(!verify_password("Abcdef1!", "abcd", &salt).unwrap());
    }
}
