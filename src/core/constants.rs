//! Constants used throughout credhop.
//!
//! Centralizes derivation contexts, hashing parameters, routes and the
//! default deployment layout.

/// HKDF context for the 32-byte email cipher key.
pub const EMAIL_KEY_CONTEXT: &str = "email-encryption-v1";

/// HKDF context for the 12-byte fixed email nonce.
pub const EMAIL_NONCE_CONTEXT: &str = "email-nonce-v1";

/// Master key length in bytes (AES-256).
pub const MASTER_KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Password salt length in bytes (before hex encoding).
pub const SALT_LEN: usize = 16;

/// Argon2id parameters, version 1. Stored hashes depend on these values;
/// changing them requires a new version, not an edit.
pub const ARGON2_ITERATIONS: u32 = 1;
pub const ARGON2_MEMORY_KIB: u32 = 32 * 1024;
pub const ARGON2_LANES: u32 = 4;
pub const ARGON2_OUTPUT_LEN: usize = 32;

/// Registration endpoint on Gateway and Switch.
pub const REGISTER_PATH: &str = "/api/register";

/// Storage endpoint on the Vault.
pub const STORE_PATH: &str = "/api/store-user";

/// Health endpoint on every hop.
pub const HEALTH_PATH: &str = "/api/health";

/// Largest request body a hop will read.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Default outbound request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default outbound connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Environment variable holding the hex-encoded master key.
pub const MASTER_KEY_ENV: &str = "CREDHOP_MASTER_KEY";

/// Environment variable naming the deployment environment.
pub const ENVIRONMENT_ENV: &str = "CREDHOP_ENV";

/// Environment variable pointing at a hop config file.
pub const CONFIG_ENV: &str = "CREDHOP_CONFIG";

/// Environment variable holding the tracing filter.
pub const LOG_ENV: &str = "CREDHOP_LOG";

/// Root directory of the default certificate layout.
pub const CERT_DIR: &str = "certificates";
