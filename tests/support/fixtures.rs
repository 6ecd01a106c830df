//! Request fixtures.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

pub const EMAIL: &str = "alice@example.com";

/// Passes length, weak-list, and complexity checks.
pub const PASSWORD: &str = "Str0ng!Passw0rd";

/// Valid `ssh-ed25519` authorized_keys line; `seed` varies the key bytes.
pub fn ssh_key(seed: u8) -> String {
    let mut blob = Vec::new();
    for part in [&b"ssh-ed25519"[..], &[seed.wrapping_add(1); 32][..]] {
        blob.extend_from_slice(&(part.len() as u32).to_be_bytes());
        blob.extend_from_slice(part);
    }
    format!("ssh-ed25519 {} user{}@laptop", STANDARD.encode(blob), seed)
}

pub fn registration(email: &str, password: &str, ssh_public_key: &str) -> Value {
    json!({
        "email": email,
        "password": password,
        "ssh_public_key": ssh_public_key,
    })
}

pub fn valid_registration() -> Value {
    registration(EMAIL, PASSWORD, &ssh_key(1))
}
