//! Stage outcome.
//!
//! Every pipeline stage returns an [`Outcome`]; only `Accepted` lets a
//! request advance.

use crate::error::{
    AuthError, ConflictError, Error, StorageError, TransportError, ValidationError,
};

/// Tagged result of one pipeline stage.
#[derive(Debug)]
pub enum Outcome<T> {
    Accepted(T),
    Rejected(ValidationError),
    Unauthorized(AuthError),
    Conflict(ConflictError),
    UpstreamFailure(TransportError),
    StorageFailure(StorageError),
    /// Local crypto, config or I/O failure.
    Internal(Error),
}

impl<T> Outcome<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    /// Apply `f` to an accepted payload, pass failures through.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Accepted(v) => Outcome::Accepted(f(v)),
            Outcome::Rejected(e) => Outcome::Rejected(e),
            Outcome::Unauthorized(e) => Outcome::Unauthorized(e),
            Outcome::Conflict(e) => Outcome::Conflict(e),
            Outcome::UpstreamFailure(e) => Outcome::UpstreamFailure(e),
            Outcome::StorageFailure(e) => Outcome::StorageFailure(e),
            Outcome::Internal(e) => Outcome::Internal(e),
        }
    }

    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Outcome::Accepted(v) => Ok(v),
            Outcome::Rejected(e) => Err(e.into()),
            Outcome::Unauthorized(e) => Err(e.into()),
            Outcome::Conflict(e) => Err(e.into()),
            Outcome::UpstreamFailure(e) => Err(e.into()),
            Outcome::StorageFailure(e) => Err(e.into()),
            Outcome::Internal(e) => Err(e),
        }
    }
}

impl<T> From<Error> for Outcome<T> {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(e) => Outcome::Rejected(e),
            Error::Auth(e) => Outcome::Unauthorized(e),
            Error::Conflict(e) => Outcome::Conflict(e),
            Error::Transport(e) => Outcome::UpstreamFailure(e),
            Error::Storage(StorageError::AlreadyExists(c)) => Outcome::Conflict(c),
            Error::Storage(e) => Outcome::StorageFailure(e),
            other => Outcome::Internal(other),
        }
    }
}

impl<T> From<Result<T, Error>> for Outcome<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(v) => Outcome::Accepted(v),
            Err(e) => e.into(),
        }
    }
}
