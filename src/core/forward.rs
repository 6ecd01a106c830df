//! Outbound delivery to the next hop.
//!
//! Requests go over mutually authenticated TLS 1.3. The URL host is the
//! expected peer name and the configured address is pinned to it, so the
//! server certificate is checked against the name rather than the IP. The
//! organization pin lives in the TLS client config (see
//! [`crate::core::tls::client_config`]) and fails the handshake itself.

use std::error::Error as StdError;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use rustls::ClientConfig;
use tracing::{debug, warn};

use crate::core::domain::Outcome;
use crate::core::types::{ApiResponse, RegistrationRequest, Role};
use crate::error::{ConfigError, ConflictError, TransportError, ValidationCategory, ValidationError};

/// Something a hop can hand a validated request to.
#[async_trait::async_trait]
pub trait NextHop: Send + Sync {
    /// Role of the receiving hop, for logs.
    fn target(&self) -> Role;

    /// Deliver the request and decode the receiver's answer.
    async fn forward(&self, request: &RegistrationRequest) -> Outcome<ApiResponse>;
}

/// Where and how to reach the next hop.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    pub role: Role,
    /// `host:port` of the next hop.
    pub address: String,
    /// DNS name the next hop's certificate must carry.
    pub server_name: String,
    /// Required first subject organization of the next hop's certificate.
    pub organization: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

/// reqwest-backed [`NextHop`].
pub struct HopForwarder {
    client: reqwest::Client,
    url: String,
    target: UpstreamTarget,
}

impl HopForwarder {
    pub fn new(target: UpstreamTarget, mut tls: ClientConfig) -> Result<Self, ConfigError> {
        let socket = resolve_address(&target.address)?;
        tls.alpn_protocols = vec![b"http/1.1".to_vec()];

        let client = reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .resolve(&target.server_name, socket)
            .https_only(true)
            .timeout(target.timeout)
            .connect_timeout(target.connect_timeout)
            .build()
            .map_err(|e| ConfigError::Tls(format!("http client: {}", e)))?;

        let url = format!(
            "https://{}:{}{}",
            target.server_name,
            socket.port(),
            target.role.intake_path()
        );

        Ok(Self {
            client,
            url,
            target,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl NextHop for HopForwarder {
    fn target(&self) -> Role {
        self.target.role
    }

    async fn forward(&self, request: &RegistrationRequest) -> Outcome<ApiResponse> {
        debug!(url = %self.url, "forwarding to {}", self.target.role);

        let response = match self.client.post(&self.url).json(request).send().await {
            Ok(r) => r,
            Err(e) => {
                let classified = classify(&e);
                warn!(
                    next_hop = %self.target.role,
                    error = %e,
                    status = classified.status(),
                    "forwarding failed"
                );
                return Outcome::UpstreamFailure(classified);
            }
        };

        let status = response.status().as_u16();
        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return Outcome::UpstreamFailure(classify(&e)),
        };

        debug!(next_hop = %self.target.role, status, "next hop replied");
        decode_reply(status, &body)
    }
}

fn resolve_address(address: &str) -> Result<SocketAddr, ConfigError> {
    address
        .to_socket_addrs()
        .map_err(|e| ConfigError::Tls(format!("upstream address {}: {}", address, e)))?
        .next()
        .ok_or_else(|| ConfigError::Tls(format!("upstream address {} did not resolve", address)))
}

/// Map a reqwest failure onto the upstream taxonomy.
pub fn classify(err: &reqwest::Error) -> TransportError {
    classify_chain(err, err.is_timeout())
}

/// Walk an error and its sources.
///
/// Order matters: a timeout wins, then a refused connection, then anything
/// that looks like a certificate or handshake failure.
pub fn classify_chain(err: &(dyn StdError + 'static), timed_out: bool) -> TransportError {
    let detail = render_chain(err);
    if timed_out {
        return TransportError::Timeout(detail);
    }

    let mut refused = false;
    let mut identity = false;
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);

    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::TimedOut => return TransportError::Timeout(detail),
                io::ErrorKind::ConnectionRefused => refused = true,
                _ => {}
            }
            if io_err
                .get_ref()
                .is_some_and(|inner| inner.downcast_ref::<rustls::Error>().is_some())
            {
                identity = true;
            }
        }
        if e.downcast_ref::<rustls::Error>().is_some() {
            identity = true;
        }
        current = e.source();
    }

    let lowered = detail.to_lowercase();
    if refused {
        TransportError::Unavailable(detail)
    } else if identity || lowered.contains("certificate") || lowered.contains("handshake") {
        TransportError::IdentityFailure(detail)
    } else {
        TransportError::Failure(detail)
    }
}

fn render_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}

/// Turn the next hop's status and body into an [`Outcome`].
pub fn decode_reply(status: u16, body: &[u8]) -> Outcome<ApiResponse> {
    let reply: ApiResponse = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            return Outcome::UpstreamFailure(TransportError::InvalidResponse(format!(
                "status {}: {}",
                status, e
            )))
        }
    };

    match status {
        200..=299 if reply.success => Outcome::Accepted(reply),
        200..=299 => Outcome::UpstreamFailure(TransportError::InvalidResponse(format!(
            "status {} without success flag",
            status
        ))),
        400 => match ValidationCategory::from_public_message(&reply.message) {
            Some(category) => Outcome::Rejected(ValidationError::from_category(
                category,
                "rejected by next hop",
            )),
            None => Outcome::UpstreamFailure(TransportError::InvalidResponse(format!(
                "unrecognized rejection: {}",
                reply.message
            ))),
        },
        401 | 403 => Outcome::UpstreamFailure(TransportError::IdentityFailure(format!(
            "next hop refused this hop's certificate (status {})",
            status
        ))),
        409 => match ConflictError::from_public_message(&reply.message) {
            Some(conflict) => Outcome::Conflict(conflict),
            None => Outcome::UpstreamFailure(TransportError::InvalidResponse(format!(
                "unrecognized conflict: {}",
                reply.message
            ))),
        },
        503 => Outcome::UpstreamFailure(TransportError::Unavailable(reply.message)),
        504 => Outcome::UpstreamFailure(TransportError::Timeout(reply.message)),
        _ => Outcome::UpstreamFailure(TransportError::Failure(format!(
            "status {}: {}",
            status, reply.message
        ))),
    }
}
