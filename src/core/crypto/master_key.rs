//! Vault master key: loading, screening and generation.
//!
//! The key is 32 bytes held in a zeroizing buffer. Every source goes through
//! [`validate_key_strength`] before the key is usable, which catches
//! placeholder and accidentally patterned keys. It is not an entropy test.

use std::fmt;
use std::fs;
use std::path::Path;

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::core::constants::{ENVIRONMENT_ENV, MASTER_KEY_ENV, MASTER_KEY_LEN};
use crate::error::{ConfigError, CryptoError, Error, Result};

/// Minimum number of distinct byte values in a 32-byte key.
pub const MIN_DISTINCT_BYTES: usize = 16;

/// Maximum number of times any single byte value may appear.
pub const MAX_BYTE_REPEATS: usize = 8;

/// Longest repeating unit the pattern check looks for.
pub const MAX_PATTERN_LEN: usize = 4;

const GENERATE_ATTEMPTS: usize = 16;

/// Where a loaded key came from. Logged at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    File,
    Development,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Environment => write!(f, "environment ({})", MASTER_KEY_ENV),
            KeySource::File => f.write_str("key file"),
            KeySource::Development => f.write_str("generated (development only)"),
        }
    }
}

/// 32-byte AES-256 master key.
#[derive(Clone)]
pub struct MasterKey {
    bytes: Zeroizing<[u8; MASTER_KEY_LEN]>,
}

impl MasterKey {
    /// Screen and wrap raw key bytes.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, CryptoError> {
        validate_key_strength(bytes)?;
        let mut buf = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self { bytes: buf })
    }

    /// Parse 64 hex characters.
    pub fn from_hex(encoded: &str) -> std::result::Result<Self, CryptoError> {
        let decoded = Zeroizing::new(
            hex::decode(encoded.trim())
                .map_err(|e| CryptoError::InvalidMasterKey(format!("not hex: {}", e)))?,
        );
        Self::from_bytes(&decoded)
    }

    /// Fresh random key that passes the strength screen.
    pub fn generate() -> std::result::Result<Self, CryptoError> {
        let mut buf = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        for _ in 0..GENERATE_ATTEMPTS {
            OsRng
                .try_fill_bytes(&mut *buf)
                .map_err(|e| CryptoError::Rng(e.to_string()))?;
            if validate_key_strength(&*buf).is_ok() {
                return Ok(Self { bytes: buf });
            }
        }
        Err(CryptoError::InvalidMasterKey(
            "random generator kept producing weak keys".to_string(),
        ))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &*self.bytes
    }

    /// Hex encoding, for `credhop keygen` output.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&*self.bytes))
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// Coarse screen for weak or placeholder keys.
///
/// Rejects wrong length, all-zero, all-0xFF, a repeating unit of 1 to 4
/// bytes, fewer than 16 distinct values, or any value repeated more than
/// 8 times.
pub fn validate_key_strength(key: &[u8]) -> std::result::Result<(), CryptoError> {
    if key.len() != MASTER_KEY_LEN {
        return Err(CryptoError::InvalidMasterKey(format!(
            "expected {} bytes, got {}",
            MASTER_KEY_LEN,
            key.len()
        )));
    }
    if key.iter().all(|&b| b == 0) {
        return Err(CryptoError::InvalidMasterKey("key is all zeros".to_string()));
    }
    if key.iter().all(|&b| b == 0xFF) {
        return Err(CryptoError::InvalidMasterKey("key is all 0xFF".to_string()));
    }
    if has_repeating_pattern(key) {
        return Err(CryptoError::InvalidMasterKey(
            "key is a repeating byte pattern".to_string(),
        ));
    }

    let mut counts = [0usize; 256];
    for &b in key {
        counts[b as usize] += 1;
    }
    let distinct = counts.iter().filter(|&&c| c > 0).count();
    if distinct < MIN_DISTINCT_BYTES {
        return Err(CryptoError::InvalidMasterKey(format!(
            "only {} distinct byte values",
            distinct
        )));
    }
    if counts.iter().any(|&c| c > MAX_BYTE_REPEATS) {
        return Err(CryptoError::InvalidMasterKey(
            "a byte value repeats too often".to_string(),
        ));
    }

    Ok(())
}

fn has_repeating_pattern(key: &[u8]) -> bool {
    (1..=MAX_PATTERN_LEN)
        .filter(|len| key.len() % len == 0)
        .any(|len| key.iter().enumerate().all(|(i, b)| *b == key[i % len]))
}

/// Load the master key from the process environment.
///
/// Order: `CREDHOP_MASTER_KEY`, then `key_file`, then a generated key when
/// `CREDHOP_ENV` names a development environment.
pub fn load(key_file: Option<&Path>) -> Result<(MasterKey, KeySource)> {
    load_from(
        std::env::var(MASTER_KEY_ENV).ok(),
        key_file,
        std::env::var(ENVIRONMENT_ENV).ok(),
    )
}

/// Same as [`load`] with the environment passed in.
pub fn load_from(
    env_key: Option<String>,
    key_file: Option<&Path>,
    environment: Option<String>,
) -> Result<(MasterKey, KeySource)> {
    if let Some(encoded) = env_key.map(Zeroizing::new) {
        if !encoded.trim().is_empty() {
            let key = MasterKey::from_hex(&encoded)
                .map_err(|e| ConfigError::InvalidMasterKey(format!("{}: {}", MASTER_KEY_ENV, e)))?;
            return Ok((key, KeySource::Environment));
        }
    }

    if let Some(path) = key_file {
        return Ok((read_key_file(path)?, KeySource::File));
    }

    if environment.as_deref().is_some_and(is_development) {
        tracing::warn!(
            "no master key configured; generated an ephemeral key. \
             Data stored with it is unreadable after restart. Never use this in production"
        );
        return Ok((MasterKey::generate()?, KeySource::Development));
    }

    Err(ConfigError::MissingMasterKey.into())
}

/// Whether `environment` names a development deployment.
pub(crate) fn is_development(environment: &str) -> bool {
    matches!(
        environment.to_ascii_lowercase().as_str(),
        "development" | "dev" | "local"
    )
}

/// Read a key file holding either 64 hex characters or 32 raw bytes.
pub fn read_key_file(path: &Path) -> Result<MasterKey> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.display().to_string()).into());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = fs::metadata(path)?.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(ConfigError::InvalidMasterKey(format!(
                "{} is accessible by group or others (mode {:o}); run: chmod 600 {}",
                path.display(),
                mode & 0o777,
                path.display()
            ))
            .into());
        }
    }

    let contents = Zeroizing::new(fs::read(path).map_err(ConfigError::ReadFile)?);
    let key = if contents.len() == MASTER_KEY_LEN {
        MasterKey::from_bytes(&contents)
    } else {
        let text = std::str::from_utf8(&contents).map_err(|_| {
            ConfigError::InvalidMasterKey(format!(
                "{} is neither 32 raw bytes nor hex text",
                path.display()
            ))
        })?;
        MasterKey::from_hex(text)
    };

    key.map_err(|e| Error::from(ConfigError::InvalidMasterKey(format!("{}: {}", path.display(), e))))
}
