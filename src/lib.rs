//! Credhop - user registration over a three-hop mutual-TLS chain.
//!
//! A client posts a registration to the Gateway, which forwards it to the
//! Switch, which forwards it to the Vault. Each hop re-validates the request
//! and admits only its configured predecessor, identified by the
//! organization in its client certificate. The Vault encrypts the email,
//! hashes the password, and stores the record.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── hop           # gateway / switch / vault commands
//! │   ├── keygen        # Master key generation
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── config        # HopConfig: defaults, TOML, overrides
//!     ├── validation    # Request field rules
//!     ├── ssh           # authorized_keys line parser
//!     ├── crypto/       # HKDF, AES-GCM email, Argon2id, master key
//!     ├── identity      # Peer certificate policy
//!     ├── tls           # rustls client and server configs
//!     ├── forward       # NextHop trait and HTTPS forwarder
//!     ├── store/        # CredentialStore trait, memory and fs backends
//!     ├── pipeline      # Per-request stage orchestration
//!     └── server        # hyper listener and routing
//! ```

pub mod cli;
pub mod core;
pub mod error;
