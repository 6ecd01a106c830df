//! Peer identity types.
//!
//! A [`PeerConnection`] is what the transport hands the core for each
//! request; a [`PeerIdentity`] is what survives certificate verification.
//! Neither is ever persisted.

use std::fmt;
use std::net::SocketAddr;

/// A terminated inbound connection, as seen by the core.
#[derive(Clone)]
pub struct PeerConnection {
    /// Remote socket address, for logs.
    pub remote: SocketAddr,
    /// Whether the connection was TLS-terminated.
    pub encrypted: bool,
    /// DER-encoded leaf certificate the peer presented, if any. The TLS
    /// layer has already verified it chains to the configured CA.
    pub leaf_certificate: Option<Vec<u8>>,
}

impl PeerConnection {
    pub fn tls(remote: SocketAddr, leaf_certificate: Option<Vec<u8>>) -> Self {
        Self {
            remote,
            encrypted: true,
            leaf_certificate,
        }
    }

    pub fn plaintext(remote: SocketAddr) -> Self {
        Self {
            remote,
            encrypted: false,
            leaf_certificate: None,
        }
    }
}

impl fmt::Debug for PeerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerConnection")
            .field("remote", &self.remote)
            .field("encrypted", &self.encrypted)
            .field("has_certificate", &self.leaf_certificate.is_some())
            .finish()
    }
}

/// Subject fields extracted from a verified peer certificate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeerIdentity {
    pub common_name: Option<String>,
    pub organizations: Vec<String>,
    /// False for anonymous TLS clients admitted by an open policy.
    pub certified: bool,
}

impl PeerIdentity {
    /// Identity for a TLS client that presented no certificate.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// First organization in the subject, the one authorization checks.
    pub fn organization(&self) -> Option<&str> {
        self.organizations.first().map(String::as_str)
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.certified {
            return f.write_str("anonymous");
        }
        write!(
            f,
            "CN={} O={}",
            self.common_name.as_deref().unwrap_or("-"),
            self.organization().unwrap_or("-")
        )
    }
}
