//! HTTPS listener for one hop.
//!
//! Uses hyper http1 over tokio-rustls. Each connection gets its own task;
//! the peer certificate is captured once per connection and handed to the
//! pipeline with every request on it.

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rustls::ServerConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, info_span, warn, Instrument};
use zeroize::Zeroizing;

use crate::core::constants::{HEALTH_PATH, MAX_BODY_BYTES};
use crate::core::domain::PeerConnection;
use crate::core::pipeline::PipelineOrchestrator;
use crate::core::tls::peer_leaf;
use crate::core::types::ApiResponse;

/// Longest a client may take to finish the TLS handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// A bound, not yet serving, hop listener.
pub struct HopServer {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    orchestrator: Arc<PipelineOrchestrator>,
}

impl HopServer {
    pub async fn bind(
        addr: SocketAddr,
        tls: Arc<ServerConfig>,
        orchestrator: Arc<PipelineOrchestrator>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(tls),
            orchestrator,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let role = self.orchestrator.role();
        info!(hop = %role, addr = %self.local_addr()?, "listening");

        tokio::pin!(shutdown);
        loop {
            let (stream, remote) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "accept failed");
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    info!(hop = %role, "shutting down");
                    return Ok(());
                }
            };

            let acceptor = self.acceptor.clone();
            let orchestrator = Arc::clone(&self.orchestrator);
            tokio::spawn(async move {
                serve_connection(acceptor, orchestrator, stream, remote).await;
            });
        }
    }
}

async fn serve_connection(
    acceptor: TlsAcceptor,
    orchestrator: Arc<PipelineOrchestrator>,
    stream: TcpStream,
    remote: SocketAddr,
) {
    let tls_stream = match tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => {
            warn!(remote = %remote, error = %e, "tls handshake failed");
            return;
        }
        Err(_) => {
            warn!(remote = %remote, "tls handshake timed out");
            return;
        }
    };

    let conn = PeerConnection::tls(remote, peer_leaf(tls_stream.get_ref().1.peer_certificates()));
    debug!(remote = %remote, client_cert = conn.leaf_certificate.is_some(), "tls established");

    let service = service_fn(move |req| {
        let orchestrator = Arc::clone(&orchestrator);
        let conn = conn.clone();
        async move { Ok::<_, Infallible>(route(&orchestrator, &conn, req).await) }
    });

    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(tls_stream), service)
        .await
    {
        debug!(remote = %remote, error = %e, "connection closed with error");
    }
}

/// Dispatch one request to the pipeline.
pub async fn route(
    orchestrator: &PipelineOrchestrator,
    conn: &PeerConnection,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!(
        "request",
        hop = %orchestrator.role(),
        remote = %conn.remote,
        request_id = %request_id
    );

    async move {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let intake = orchestrator.role().intake_path();

        let response = match (path.as_str(), &method) {
            (p, &Method::POST) if p == intake => match read_body(req.into_body()).await {
                Ok(body) => {
                    let reply = orchestrator.handle(conn, &body).await;
                    json_response(reply.status, &reply.body)
                }
                Err(response) => response,
            },
            (p, _) if p == intake => method_not_allowed("POST"),
            (HEALTH_PATH, &Method::GET) => {
                let reply = orchestrator.health(conn);
                json_response(reply.status, &reply.body)
            }
            (HEALTH_PATH, _) => method_not_allowed("GET"),
            _ => json_response(404, &ApiResponse::error("not found")),
        };

        info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request handled"
        );
        response
    }
    .instrument(span)
    .await
}

/// Collect a request body of at most [`MAX_BODY_BYTES`] into a buffer that
/// is wiped on drop. The body carries the plaintext password.
async fn read_body<B>(body: B) -> Result<Zeroizing<Vec<u8>>, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let mut body = Limited::new(body, MAX_BODY_BYTES);
    let mut buf = Zeroizing::new(Vec::new());

    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Some(data) = frame.data_ref() {
                    push_wiped(&mut buf, data);
                }
            }
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return Err(json_response(
                    413,
                    &ApiResponse::error("request body too large"),
                ));
            }
            Err(e) => {
                debug!(error = %e, "failed to read request body");
                return Err(json_response(400, &ApiResponse::error("invalid JSON body")));
            }
        }
    }
    Ok(buf)
}

/// Append without letting `Vec` reallocate in place: a grown buffer is
/// copied into a fresh one, and the old one is wiped as it drops.
fn push_wiped(buf: &mut Zeroizing<Vec<u8>>, data: &[u8]) {
    let needed = buf.len() + data.len();
    if needed > buf.capacity() {
        let mut grown = Zeroizing::new(Vec::with_capacity(needed.max(buf.capacity() * 2)));
        grown.extend_from_slice(buf);
        *buf = grown;
    }
    buf.extend_from_slice(data);
}

fn method_not_allowed(allow: &'static str) -> Response<Full<Bytes>> {
    let mut response = json_response(405, &ApiResponse::error("method not allowed"));
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

/// JSON response with the given status.
pub fn json_response(status: u16, body: &ApiResponse) -> Response<Full<Bytes>> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| {
        br#"{"success":false,"message":"internal server error"}"#.to_vec()
    });

    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() =
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
