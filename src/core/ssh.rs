//! OpenSSH authorized-key parsing.
//!
//! Parses `algorithm base64-blob [comment]` lines and checks the binary wire
//! format of the blob. The blob starts with a big-endian `u32` length followed
//! by the algorithm name; that embedded name must equal the textual prefix,
//! which catches keys whose prefix was swapped for a different algorithm.
//!
//! Failures carry a [`SshKeyError`] describing the exact sub-rule. Those
//! details are for internal logs; callers only ever see the generic
//! "invalid SSH public key format" message.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Shortest accepted authorized-key line, after trimming.
pub const MIN_LINE_LEN: usize = 80;

/// Shortest accepted decoded blob.
pub const MIN_BLOB_LEN: usize = 20;

/// Bounds on the embedded algorithm-name length.
pub const MIN_ALGORITHM_NAME_LEN: usize = 7;
pub const MAX_ALGORITHM_NAME_LEN: usize = 50;

/// Why a key line was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SshKeyError {
    #[error("key line is {0} characters, minimum is {MIN_LINE_LEN}")]
    TooShort(usize),

    #[error("key line has no base64 field")]
    MissingKeyData,

    #[error("algorithm {0:?} is not accepted")]
    UnsupportedAlgorithm(String),

    #[error("{algorithm} key data is {len} base64 characters, expected {min}..={max}")]
    KeyDataLength {
        algorithm: &'static str,
        len: usize,
        min: usize,
        max: usize,
    },

    #[error("key data is not base64")]
    InvalidBase64Alphabet,

    #[error("key data failed to decode: {0}")]
    Decode(String),

    #[error("decoded key is {0} bytes, minimum is {MIN_BLOB_LEN}")]
    BlobTooShort(usize),

    #[error("embedded algorithm name length {0} is out of range")]
    AlgorithmNameLength(usize),

    #[error("embedded algorithm {embedded:?} does not match prefix {prefix:?}")]
    AlgorithmMismatch { prefix: String, embedded: String },
}

/// Accepted key algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SshAlgorithm {
    Rsa,
    Ed25519,
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
    SkEd25519,
    SkEcdsaP256,
}

impl SshAlgorithm {
    pub const ALL: [SshAlgorithm; 7] = [
        SshAlgorithm::Rsa,
        SshAlgorithm::Ed25519,
        SshAlgorithm::EcdsaP256,
        SshAlgorithm::EcdsaP384,
        SshAlgorithm::EcdsaP521,
        SshAlgorithm::SkEd25519,
        SshAlgorithm::SkEcdsaP256,
    ];

    /// Wire name, as it appears both in the line prefix and inside the blob.
    pub fn name(&self) -> &'static str {
        match self {
            SshAlgorithm::Rsa => "ssh-rsa",
            SshAlgorithm::Ed25519 => "ssh-ed25519",
            SshAlgorithm::EcdsaP256 => "ecdsa-sha2-nistp256",
            SshAlgorithm::EcdsaP384 => "ecdsa-sha2-nistp384",
            SshAlgorithm::EcdsaP521 => "ecdsa-sha2-nistp521",
            SshAlgorithm::SkEd25519 => "sk-ssh-ed25519@openssh.com",
            SshAlgorithm::SkEcdsaP256 => "sk-ecdsa-sha2-nistp256@openssh.com",
        }
    }

    /// Inclusive range of plausible base64 lengths for this algorithm.
    ///
    /// Checked before decoding so truncated or padded-out keys are refused
    /// without touching the decoder.
    pub fn base64_len_range(&self) -> (usize, usize) {
        match self {
            SshAlgorithm::Rsa => (300, 800),
            SshAlgorithm::Ed25519 => (60, 80),
            SshAlgorithm::EcdsaP256 => (100, 150),
            SshAlgorithm::EcdsaP384 => (120, 170),
            SshAlgorithm::EcdsaP521 => (140, 200),
            SshAlgorithm::SkEd25519 => (80, 120),
            SshAlgorithm::SkEcdsaP256 => (120, 180),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

/// A structurally valid public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshPublicKey {
    pub algorithm: SshAlgorithm,
    pub blob: Vec<u8>,
    pub comment: Option<String>,
}

/// Parse and structurally validate an authorized-key line.
pub fn parse_authorized_key(line: &str) -> Result<SshPublicKey, SshKeyError> {
    let line = line.trim();
    if line.len() < MIN_LINE_LEN {
        return Err(SshKeyError::TooShort(line.len()));
    }

    let mut fields = line.split_whitespace();
    let prefix = fields.next().unwrap_or_default();
    let key_data = fields.next().ok_or(SshKeyError::MissingKeyData)?;
    let comment = {
        let rest: Vec<&str> = fields.collect();
        (!rest.is_empty()).then(|| rest.join(" "))
    };

    let algorithm = SshAlgorithm::from_name(prefix)
        .ok_or_else(|| SshKeyError::UnsupportedAlgorithm(prefix.to_string()))?;

    let (min, max) = algorithm.base64_len_range();
    if key_data.len() < min || key_data.len() > max {
        return Err(SshKeyError::KeyDataLength {
            algorithm: algorithm.name(),
            len: key_data.len(),
            min,
            max,
        });
    }

    if !is_base64_alphabet(key_data) {
        return Err(SshKeyError::InvalidBase64Alphabet);
    }

    let blob = STANDARD
        .decode(key_data)
        .map_err(|e| SshKeyError::Decode(e.to_string()))?;

    if blob.len() < MIN_BLOB_LEN {
        return Err(SshKeyError::BlobTooShort(blob.len()));
    }

    check_embedded_algorithm(algorithm, &blob)?;

    Ok(SshPublicKey {
        algorithm,
        blob,
        comment,
    })
}

/// Identity of a key for duplicate detection: `algorithm base64`, with the
/// comment and surrounding whitespace dropped.
///
/// Lines that do not parse fall back to their first two fields, so stored
/// records from before validation still index consistently.
pub fn canonical_key(line: &str) -> String {
    match parse_authorized_key(line) {
        Ok(key) => format!("{} {}", key.algorithm.name(), STANDARD.encode(&key.blob)),
        Err(_) => line
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// `[A-Za-z0-9+/]*` followed by at most two `=`.
fn is_base64_alphabet(data: &str) -> bool {
    let body = data.trim_end_matches('=');
    if data.len() - body.len() > 2 {
        return false;
    }
    body.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Compare the length-prefixed name at the start of the blob with the prefix.
fn check_embedded_algorithm(algorithm: SshAlgorithm, blob: &[u8]) -> Result<(), SshKeyError> {
    let header: [u8; 4] = blob
        .get(..4)
        .and_then(|h| h.try_into().ok())
        .ok_or(SshKeyError::BlobTooShort(blob.len()))?;
    let name_len = u32::from_be_bytes(header) as usize;

    if !(MIN_ALGORITHM_NAME_LEN..=MAX_ALGORITHM_NAME_LEN).contains(&name_len)
        || 4 + name_len > blob.len()
    {
        return Err(SshKeyError::AlgorithmNameLength(name_len));
    }

    let embedded = &blob[4..4 + name_len];
    if embedded != algorithm.name().as_bytes() {
        return Err(SshKeyError::AlgorithmMismatch {
            prefix: algorithm.name().to_string(),
            embedded: String::from_utf8_lossy(embedded).into_owned(),
        });
    }

    Ok(())
}
