//! Inbound peer verification.
//!
//! Runs before any body is read. The TLS layer has already checked the
//! certificate chain against the CA; this module turns the leaf into a
//! [`PeerIdentity`] and applies the hop's organization policy.

use tracing::{info, warn};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::core::domain::{PeerConnection, PeerIdentity};
use crate::core::types::Role;
use crate::error::AuthError;

/// Who may call a hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Any TLS client, with or without a certificate.
    AnyClient,
    /// Only certificates whose first subject organization matches exactly.
    Organization(String),
}

impl AccessPolicy {
    /// Default policy for a role: open at the Gateway, otherwise the
    /// predecessor's organization.
    pub fn for_role(role: Role) -> Self {
        match role.predecessor() {
            Some(caller) => AccessPolicy::Organization(caller.organization().to_string()),
            None => AccessPolicy::AnyClient,
        }
    }

    pub fn from_option(organization: Option<String>) -> Self {
        organization.map_or(AccessPolicy::AnyClient, AccessPolicy::Organization)
    }
}

/// Authenticates and authorizes the caller of one hop.
#[derive(Debug, Clone)]
pub struct IdentityVerifier {
    hop: Role,
    policy: AccessPolicy,
}

impl IdentityVerifier {
    pub fn new(hop: Role, policy: AccessPolicy) -> Self {
        Self { hop, policy }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Verify a connection and emit an audit record either way.
    pub fn verify(&self, conn: &PeerConnection) -> Result<PeerIdentity, AuthError> {
        let result = self.check(conn);
        match &result {
            Ok(peer) => info!(
                target: "audit",
                hop = %self.hop,
                remote = %conn.remote,
                cn = peer.common_name.as_deref().unwrap_or("-"),
                org = peer.organization().unwrap_or("-"),
                "peer authenticated"
            ),
            Err(e) => warn!(
                target: "audit",
                hop = %self.hop,
                remote = %conn.remote,
                status = e.status(),
                reason = %e,
                "peer rejected"
            ),
        }
        result
    }

    fn check(&self, conn: &PeerConnection) -> Result<PeerIdentity, AuthError> {
        if !conn.encrypted {
            return Err(AuthError::TlsRequired);
        }

        let peer = match (&conn.leaf_certificate, &self.policy) {
            (Some(der), _) => parse_peer_certificate(der)?,
            (None, AccessPolicy::AnyClient) => return Ok(PeerIdentity::anonymous()),
            (None, AccessPolicy::Organization(_)) => return Err(AuthError::MissingCertificate),
        };

        if let AccessPolicy::Organization(expected) = &self.policy {
            check_organization(&peer, expected)?;
        }

        Ok(peer)
    }
}

/// Extract subject common name and organizations from a DER certificate.
pub fn parse_peer_certificate(der: &[u8]) -> Result<PeerIdentity, AuthError> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| AuthError::InvalidCertificate(e.to_string()))?;
    let subject = cert.subject();

    let common_name = subject
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);

    let organizations = subject
        .iter_organization()
        .filter_map(|o| o.as_str().ok())
        .map(str::to_string)
        .collect();

    Ok(PeerIdentity {
        common_name,
        organizations,
        certified: true,
    })
}

/// Exact match on the first organization.
pub fn check_organization(peer: &PeerIdentity, expected: &str) -> Result<(), AuthError> {
    match peer.organization() {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(AuthError::Forbidden {
            expected: expected.to_string(),
            actual: actual.map(str::to_string),
        }),
    }
}
