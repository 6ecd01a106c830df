//! rustls configuration from PEM files.
//!
//! Certificates, keys and the CA bundle are read once at startup. Both
//! directions are TLS 1.3 only and trust nothing but the configured CA.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::WebPkiClientVerifier;
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, OtherError, RootCertStore,
    ServerConfig, SignatureScheme,
};
use tracing::{debug, warn};

use crate::core::identity::{check_organization, parse_peer_certificate};
use crate::error::ConfigError;

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn open(path: &Path) -> Result<BufReader<File>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.display().to_string()));
    }
    File::open(path)
        .map(BufReader::new)
        .map_err(ConfigError::ReadFile)
}

/// Every certificate in a PEM file.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::Tls(format!("{}: {}", path.display(), e)))?;
    if certs.is_empty() {
        return Err(ConfigError::Tls(format!(
            "{}: no certificates found",
            path.display()
        )));
    }
    Ok(certs)
}

/// The first private key in a PEM file (PKCS#8, PKCS#1 or SEC1).
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ConfigError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| ConfigError::Tls(format!("{}: {}", path.display(), e)))?
        .ok_or_else(|| ConfigError::Tls(format!("{}: no private key found", path.display())))
}

/// Root store holding only the CA bundle.
pub fn load_roots(ca_path: &Path) -> Result<RootCertStore, ConfigError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(ca_path)? {
        roots
            .add(cert)
            .map_err(|e| ConfigError::Tls(format!("{}: {}", ca_path.display(), e)))?;
    }
    debug!(path = %ca_path.display(), count = roots.len(), "loaded CA bundle");
    Ok(roots)
}

/// Server side of a hop.
///
/// With `require_client_cert` unset, clients may connect without a
/// certificate, but one that is offered must still chain to the CA.
pub fn server_config(
    cert_path: &Path,
    key_path: &Path,
    ca_path: &Path,
    require_client_cert: bool,
) -> Result<Arc<ServerConfig>, ConfigError> {
    let provider = provider();
    let roots = Arc::new(load_roots(ca_path)?);

    let mut verifier = WebPkiClientVerifier::builder_with_provider(roots, provider.clone());
    if !require_client_cert {
        verifier = verifier.allow_unauthenticated();
    }
    let verifier = verifier
        .build()
        .map_err(|e| ConfigError::Tls(e.to_string()))?;

    let mut config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| ConfigError::Tls(e.to_string()))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(load_certs(cert_path)?, load_private_key(key_path)?)
        .map_err(|e| ConfigError::Tls(format!("{}: {}", cert_path.display(), e)))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Client side of a hop: presents this hop's certificate to the next one.
///
/// With `organization` set, the next hop's leaf must also carry it as its
/// first subject organization. The check runs inside the handshake, so a
/// mismatching peer never sees a request byte.
pub fn client_config(
    cert_path: &Path,
    key_path: &Path,
    ca_path: &Path,
    organization: Option<&str>,
) -> Result<ClientConfig, ConfigError> {
    let provider = provider();
    let verifier = PinnedServerVerifier::new(
        Arc::new(load_roots(ca_path)?),
        provider.clone(),
        organization.map(str::to_string),
    )?;

    ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| ConfigError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_client_auth_cert(load_certs(cert_path)?, load_private_key(key_path)?)
        .map_err(|e| ConfigError::Tls(format!("{}: {}", cert_path.display(), e)))
}

/// WebPKI server verification plus an optional organization pin on the leaf.
#[derive(Debug)]
pub struct PinnedServerVerifier {
    inner: Arc<WebPkiServerVerifier>,
    organization: Option<String>,
}

impl PinnedServerVerifier {
    pub fn new(
        roots: Arc<RootCertStore>,
        provider: Arc<CryptoProvider>,
        organization: Option<String>,
    ) -> Result<Self, ConfigError> {
        let inner = WebPkiServerVerifier::builder_with_provider(roots, provider)
            .build()
            .map_err(|e| ConfigError::Tls(e.to_string()))?;
        Ok(Self {
            inner,
            organization,
        })
    }
}

impl ServerCertVerifier for PinnedServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let verified = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        )?;

        let Some(expected) = &self.organization else {
            return Ok(verified);
        };
        let checked = parse_peer_certificate(end_entity.as_ref())
            .and_then(|peer| check_organization(&peer, expected));
        match checked {
            Ok(()) => Ok(verified),
            Err(e) => {
                warn!(
                    target: "audit",
                    server_name = ?server_name,
                    reason = %e,
                    "next hop certificate rejected"
                );
                Err(rustls::Error::InvalidCertificate(CertificateError::Other(
                    OtherError(Arc::new(e)),
                )))
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// DER of the leaf certificate a peer presented, if any.
pub fn peer_leaf(certs: Option<&[CertificateDer<'_>]>) -> Option<Vec<u8>> {
    certs.and_then(|c| c.first()).map(|c| c.as_ref().to_vec())
}
