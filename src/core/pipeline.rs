//! Per-request state machine.
//!
//! ```text
//! Start → Authenticated → Validated ─┬─→ Forwarded ──────────→ Responded
//!                                    └─→ Protected → Stored ─→ Responded
//! ```
//!
//! A request only moves forward while each stage returns
//! [`Outcome::Accepted`]; anything else goes straight to `Responded` with
//! the failure's status and sanitized message. The orchestrator knows
//! nothing about sockets: it takes a [`PeerConnection`] and body bytes and
//! returns a [`HopReply`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::crypto::CredentialProtector;
use crate::core::domain::{Outcome, PeerConnection, PeerIdentity, ProtectedCredential};
use crate::core::forward::NextHop;
use crate::core::identity::IdentityVerifier;
use crate::core::store::CredentialStore;
use crate::core::types::{ApiResponse, RegistrationRequest, Role};
use crate::core::validation::validate_registration;
use crate::error::{AuthError, ConflictError, Error, ValidationError};

/// Message returned by Gateway and Switch on success.
pub const REGISTERED_MESSAGE: &str = "user successfully registered";

/// Message returned by the Vault on success.
pub const STORED_MESSAGE: &str = "user credentials stored successfully";

/// Progress of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Authenticated,
    Validated,
    Protected,
    Forwarded,
    Stored,
    Responded,
}

/// Terminal failure states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Rejected,
    Unauthorized,
    Forbidden,
    Conflict,
    UpstreamFailed,
    StorageFailed,
    Internal,
}

impl Failure {
    fn of<T>(outcome: &Outcome<T>) -> Option<Self> {
        match outcome {
            Outcome::Accepted(_) => None,
            Outcome::Rejected(_) => Some(Failure::Rejected),
            Outcome::Unauthorized(AuthError::Forbidden { .. }) => Some(Failure::Forbidden),
            Outcome::Unauthorized(_) => Some(Failure::Unauthorized),
            Outcome::Conflict(_) => Some(Failure::Conflict),
            Outcome::UpstreamFailure(_) => Some(Failure::UpstreamFailed),
            Outcome::StorageFailure(_) => Some(Failure::StorageFailed),
            Outcome::Internal(_) => Some(Failure::Internal),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Failure::Rejected => "rejected",
            Failure::Unauthorized => "unauthorized",
            Failure::Forbidden => "forbidden",
            Failure::Conflict => "conflict",
            Failure::UpstreamFailed => "upstream-failed",
            Failure::StorageFailed => "storage-failed",
            Failure::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Status, JSON body, and how far the request got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopReply {
    pub status: u16,
    pub body: ApiResponse,
    /// Last stage reached before responding.
    pub reached: Stage,
    pub failure: Option<Failure>,
}

/// What a hop does with a validated request.
pub enum Downstream {
    /// Gateway and Switch: hand it to the next hop.
    Forward(Arc<dyn NextHop>),
    /// Vault: protect it and write it.
    Store {
        protector: CredentialProtector,
        store: Arc<dyn CredentialStore>,
    },
}

/// Drives one hop's stages for each request.
pub struct PipelineOrchestrator {
    role: Role,
    verifier: IdentityVerifier,
    downstream: Downstream,
}

/// Stage bookkeeping for one request.
struct Progress {
    role: Role,
    stage: Stage,
}

impl Progress {
    fn advance(&mut self, next: Stage) {
        debug!(hop = %self.role, from = ?self.stage, to = ?next, "stage transition");
        self.stage = next;
    }
}

impl PipelineOrchestrator {
    pub fn new(role: Role, verifier: IdentityVerifier, downstream: Downstream) -> Self {
        Self {
            role,
            verifier,
            downstream,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Run a registration through every stage.
    pub async fn handle(&self, conn: &PeerConnection, body: &[u8]) -> HopReply {
        let mut progress = Progress {
            role: self.role,
            stage: Stage::Start,
        };

        let peer = match self.authenticate(conn) {
            Outcome::Accepted(peer) => peer,
            failed => return self.fail(conn, &progress, failed),
        };
        progress.advance(Stage::Authenticated);

        let request = match parse_and_validate(body) {
            Outcome::Accepted(request) => request,
            failed => return self.fail(conn, &progress, failed),
        };
        progress.advance(Stage::Validated);

        let outcome = match &self.downstream {
            Downstream::Forward(next) => {
                let outcome = next.forward(&request).await;
                drop(request);
                if outcome.is_accepted() {
                    progress.advance(Stage::Forwarded);
                }
                outcome.map(|_| REGISTERED_MESSAGE)
            }
            Downstream::Store { protector, store } => self
                .store_registration(protector, store, request, &mut progress)
                .await
                .map(|()| STORED_MESSAGE),
        };

        match outcome {
            Outcome::Accepted(message) => {
                let reached = progress.stage;
                progress.advance(Stage::Responded);
                info!(
                    target: "audit",
                    hop = %self.role,
                    remote = %conn.remote,
                    peer = %peer,
                    status = 201,
                    "registration accepted"
                );
                HopReply {
                    status: 201,
                    body: ApiResponse::ok(message),
                    reached,
                    failure: None,
                }
            }
            failed => self.fail(conn, &progress, failed),
        }
    }

    /// Health check behind the same identity gate as registrations.
    pub fn health(&self, conn: &PeerConnection) -> HopReply {
        let progress = Progress {
            role: self.role,
            stage: Stage::Start,
        };
        match self.authenticate(conn) {
            Outcome::Accepted(_) => HopReply {
                status: 200,
                body: ApiResponse::ok(format!("{} operational", self.role)),
                reached: Stage::Authenticated,
                failure: None,
            },
            failed => self.fail(conn, &progress, failed),
        }
    }

    /// Identity stage: runs before the body is looked at.
    pub fn authenticate(&self, conn: &PeerConnection) -> Outcome<PeerIdentity> {
        match self.verifier.verify(conn) {
            Ok(peer) => Outcome::Accepted(peer),
            Err(e) => Outcome::Unauthorized(e),
        }
    }

    async fn store_registration(
        &self,
        protector: &CredentialProtector,
        store: &Arc<dyn CredentialStore>,
        request: RegistrationRequest,
        progress: &mut Progress,
    ) -> Outcome<()> {
        let (p, s) = (protector.clone(), Arc::clone(store));
        let protected = blocking(move || check_and_protect(&p, s.as_ref(), &request)).await;
        let credential = match protected {
            Outcome::Accepted(c) => c,
            failed => return failed.map(|_| ()),
        };
        progress.advance(Stage::Protected);

        let s = Arc::clone(store);
        let stored =
            blocking(move || Outcome::from(s.store_credential(&credential).map_err(Error::from)))
                .await;
        if stored.is_accepted() {
            progress.advance(Stage::Stored);
        }
        stored
    }

    fn fail<T>(&self, conn: &PeerConnection, progress: &Progress, outcome: Outcome<T>) -> HopReply {
        let failure = Failure::of(&outcome).unwrap_or(Failure::Internal);
        let category = match &outcome {
            Outcome::Rejected(e) => e.category().code().to_string(),
            _ => failure.to_string(),
        };
        let err = match outcome.into_result() {
            Err(e) => e,
            Ok(_) => Error::Io(std::io::Error::other("accepted outcome routed to failure")),
        };
        let status = err.status();

        warn!(
            hop = %self.role,
            remote = %conn.remote,
            stage = ?progress.stage,
            status,
            error = %err,
            "request failed"
        );
        info!(
            target: "audit",
            hop = %self.role,
            remote = %conn.remote,
            category = %category,
            status,
            "registration refused"
        );

        HopReply {
            status,
            body: ApiResponse::error(err.public_message()),
            reached: progress.stage,
            failure: Some(failure),
        }
    }
}

/// Decode the body and run every validation rule.
pub fn parse_and_validate(body: &[u8]) -> Outcome<RegistrationRequest> {
    let request: RegistrationRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => return Outcome::Rejected(ValidationError::MalformedBody(e.to_string())),
    };
    match validate_registration(&request) {
        Ok(()) => Outcome::Accepted(request),
        Err(e) => Outcome::Rejected(e),
    }
}

/// Duplicate checks, then the expensive hashing.
///
/// Checking first means a duplicate never pays for Argon2.
fn check_and_protect(
    protector: &CredentialProtector,
    store: &dyn CredentialStore,
    request: &RegistrationRequest,
) -> Outcome<ProtectedCredential> {
    let lookup = match protector.email_lookup_key(&request.email) {
        Ok(l) => l,
        Err(e) => return Outcome::Internal(e.into()),
    };

    match store.email_exists(&lookup) {
        Ok(true) => return Outcome::Conflict(ConflictError::EmailExists),
        Ok(false) => {}
        Err(e) => return Outcome::StorageFailure(e),
    }
    match store.ssh_key_exists(&request.ssh_public_key) {
        Ok(true) => return Outcome::Conflict(ConflictError::SshKeyExists),
        Ok(false) => {}
        Err(e) => return Outcome::StorageFailure(e),
    }

    protector
        .protect(request)
        .map_err(Error::from)
        .into()
}

async fn blocking<T, F>(work: F) -> Outcome<T>
where
    F: FnOnce() -> Outcome<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(outcome) => outcome,
        Err(e) => Outcome::Internal(Error::Io(std::io::Error::other(format!(
            "blocking task failed: {}",
            e
        )))),
    }
}
