//! Error types for credhop.
//!
//! Every failure carries two renderings: the `Display` text, which is detailed
//! and only ever written to internal logs, and [`Error::public_message`], which
//! is the short category-level string returned over the wire.

use std::fmt;

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status a hop answers with when a request ends in this error.
    pub fn status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth(e) => e.status(),
            Error::Conflict(_) => 409,
            Error::Transport(e) => e.status(),
            Error::Storage(e) => e.status(),
            Error::Crypto(_) | Error::Config(_) | Error::Io(_) => 500,
        }
    }

    /// Sanitized, caller-facing message.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::Validation(e) => e.category().public_message(),
            Error::Auth(e) => e.public_message(),
            Error::Conflict(e) => e.public_message(),
            Error::Transport(e) => e.public_message(),
            Error::Storage(e) => e.public_message(),
            Error::Crypto(_) | Error::Config(_) | Error::Io(_) => "internal server error",
        }
    }
}

/// Machine-readable validation category, shared by audit logs and the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCategory {
    MissingField,
    BadEmail,
    WeakPassword,
    BadComplexity,
    BadSshKey,
    MalformedBody,
}

impl ValidationCategory {
    pub const ALL: [ValidationCategory; 6] = [
        ValidationCategory::MissingField,
        ValidationCategory::BadEmail,
        ValidationCategory::WeakPassword,
        ValidationCategory::BadComplexity,
        ValidationCategory::BadSshKey,
        ValidationCategory::MalformedBody,
    ];

    /// Stable code used in audit records.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationCategory::MissingField => "missing-field",
            ValidationCategory::BadEmail => "bad-email",
            ValidationCategory::WeakPassword => "weak-password",
            ValidationCategory::BadComplexity => "bad-complexity",
            ValidationCategory::BadSshKey => "bad-ssh-key",
            ValidationCategory::MalformedBody => "malformed-body",
        }
    }

    /// Message returned to the caller. Never names the sub-rule that fired.
    pub fn public_message(&self) -> &'static str {
        match self {
            ValidationCategory::MissingField => "required fields missing",
            ValidationCategory::BadEmail => "invalid email format",
            ValidationCategory::WeakPassword => "password is too weak",
            ValidationCategory::BadComplexity => {
                "password must contain at least 3 of: uppercase, lowercase, digits, special characters"
            }
            ValidationCategory::BadSshKey => "invalid SSH public key format",
            ValidationCategory::MalformedBody => "invalid JSON body",
        }
    }

    /// Recover the category from a message produced by another hop.
    pub fn from_public_message(message: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.public_message() == message)
    }
}

impl fmt::Display for ValidationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Input validation failures. The payload is internal detail for logs only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required fields missing: {0}")]
    MissingField(String),

    #[error("invalid email: {0}")]
    BadEmail(String),

    #[error("weak password: {0}")]
    WeakPassword(String),

    #[error("insufficient password complexity: {0}")]
    BadComplexity(String),

    #[error("invalid ssh key: {0}")]
    BadSshKey(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    pub fn category(&self) -> ValidationCategory {
        match self {
            ValidationError::MissingField(_) => ValidationCategory::MissingField,
            ValidationError::BadEmail(_) => ValidationCategory::BadEmail,
            ValidationError::WeakPassword(_) => ValidationCategory::WeakPassword,
            ValidationError::BadComplexity(_) => ValidationCategory::BadComplexity,
            ValidationError::BadSshKey(_) => ValidationCategory::BadSshKey,
            ValidationError::MalformedBody(_) => ValidationCategory::MalformedBody,
        }
    }

    /// Build an error of the given category with an internal detail.
    pub fn from_category(category: ValidationCategory, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match category {
            ValidationCategory::MissingField => ValidationError::MissingField(detail),
            ValidationCategory::BadEmail => ValidationError::BadEmail(detail),
            ValidationCategory::WeakPassword => ValidationError::WeakPassword(detail),
            ValidationCategory::BadComplexity => ValidationError::BadComplexity(detail),
            ValidationCategory::BadSshKey => ValidationError::BadSshKey(detail),
            ValidationCategory::MalformedBody => ValidationError::MalformedBody(detail),
        }
    }
}

/// Peer authentication and authorization failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("connection is not encrypted")]
    TlsRequired,

    #[error("no client certificate presented")]
    MissingCertificate,

    #[error("client certificate could not be parsed: {0}")]
    InvalidCertificate(String),

    #[error("organization mismatch: expected {expected:?}, got {actual:?}")]
    Forbidden {
        expected: String,
        actual: Option<String>,
    },
}

impl AuthError {
    pub fn status(&self) -> u16 {
        match self {
            AuthError::Forbidden { .. } => 403,
            _ => 401,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::TlsRequired => "TLS required",
            AuthError::MissingCertificate | AuthError::InvalidCertificate(_) => {
                "client certificate required"
            }
            AuthError::Forbidden { .. } => "unauthorized client",
        }
    }
}

/// Duplicate credential material.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictError {
    #[error("email address already registered")]
    EmailExists,

    #[error("ssh public key already in use")]
    SshKeyExists,
}

impl ConflictError {
    pub fn public_message(&self) -> &'static str {
        match self {
            ConflictError::EmailExists => "email address already registered",
            ConflictError::SshKeyExists => "SSH public key already in use",
        }
    }

    pub fn from_public_message(message: &str) -> Option<Self> {
        [ConflictError::EmailExists, ConflictError::SshKeyExists]
            .into_iter()
            .find(|c| c.public_message() == message)
    }
}

/// Local cryptographic failures.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid master key: {0}")]
    InvalidMasterKey(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: ciphertext was modified or the key is wrong")]
    Decryption,

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("random number generator failed: {0}")]
    Rng(String),
}

/// Failures reaching or talking to the next hop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("upstream timed out: {0}")]
    Timeout(String),

    #[error("upstream identity check failed: {0}")]
    IdentityFailure(String),

    #[error("upstream transport failure: {0}")]
    Failure(String),

    #[error("upstream returned an unreadable response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    pub fn status(&self) -> u16 {
        match self {
            TransportError::Unavailable(_) => 503,
            TransportError::Timeout(_) => 504,
            TransportError::IdentityFailure(_) => 500,
            TransportError::Failure(_) | TransportError::InvalidResponse(_) => 502,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            TransportError::Unavailable(_) => "upstream service unavailable, please try again later",
            TransportError::Timeout(_) => "upstream service timeout, please try again later",
            TransportError::IdentityFailure(_) => {
                "security certificate validation failed, please contact the administrator"
            }
            TransportError::Failure(_) | TransportError::InvalidResponse(_) => {
                "unable to reach upstream service, please try again later"
            }
        }
    }
}

/// Persistence collaborator failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("credential already exists: {0}")]
    AlreadyExists(ConflictError),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn status(&self) -> u16 {
        match self {
            StorageError::AlreadyExists(_) => 409,
            StorageError::Unavailable(_) => 503,
            StorageError::Corrupt(_) | StorageError::Io(_) => 500,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            StorageError::AlreadyExists(c) => c.public_message(),
            StorageError::Unavailable(_) => "storage service unavailable",
            StorageError::Corrupt(_) | StorageError::Io(_) => "storage operation failed",
        }
    }
}

/// Configuration and startup failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("file not found: {0}")]
    MissingFile(String),

    #[error("missing [{0}] section for this hop")]
    MissingSection(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("no master key source: set CREDHOP_MASTER_KEY or [vault] master_key_file")]
    MissingMasterKey,

    #[error("invalid master key: {0}")]
    InvalidMasterKey(String),

    #[error("tls setup failed: {0}")]
    Tls(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        let cases: Vec<(Error, u16)> = vec![
            (ValidationError::BadEmail("x".into()).into(), 400),
            (AuthError::MissingCertificate.into(), 401),
            (
                AuthError::Forbidden {
                    expected: "SecuritySwitch".into(),
                    actual: Some("EntryHub".into()),
                }
                .into(),
                403,
            ),
            (ConflictError::EmailExists.into(), 409),
            (TransportError::Unavailable("refused".into()).into(), 503),
            (TransportError::Timeout("slow".into()).into(), 504),
            (TransportError::Failure("reset".into()).into(), 502),
            (CryptoError::Decryption.into(), 500),
            (StorageError::Unavailable("down".into()).into(), 503),
        ];

        for (err, status) in cases {
            assert_eq!(err.status(), status, "{}", err);
        }
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err: Error = ValidationError::BadSshKey("embedded algorithm ssh-rsa".into()).into();
        assert_eq!(err.public_message(), "invalid SSH public key format");
        assert!(err.to_string().contains("ssh-rsa"));

        let err: Error = AuthError::Forbidden {
            expected: "SecuritySwitch".into(),
            actual: Some("EntryHub".into()),
        }
        .into();
        assert!(!err.public_message().contains("EntryHub"));
    }

    #[test]
    fn test_category_roundtrip_through_message() {
        for category in ValidationCategory::ALL {
            assert_eq!(
                ValidationCategory::from_public_message(category.public_message()),
                Some(category)
            );
        }
        assert_eq!(ValidationCategory::from_public_message("something else"), None);
    }
}
