/// Error types for the stores and the backend services
use thiserror::Error;

use crate::state::ContextKey;

/// Failure talking to one of the external services
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request timed out")]
    Timeout,

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("not signed in")]
    Unauthenticated,

    #[error("{0} is not available on this server")]
    Unsupported(&'static str),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout
        } else if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

/// The three failure classes every store operation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad input, caught before any network call
    Validation,
    /// Network or backend failure
    Service,
    /// Reply for a context that is no longer active; never surfaced
    Stale,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("a question is already waiting for an answer in {0}")]
    Busy(ContextKey),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("response for {0} arrived after the context changed")]
    Stale(ContextKey),

    #[error("upload of {0} finished after the sources were cleared")]
    Abandoned(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StoreError::Validation(_) | StoreError::Busy(_) => FailureKind::Validation,
            StoreError::Stale(_) | StoreError::Abandoned(_) => FailureKind::Stale,
            StoreError::Service(_) | StoreError::Io(_) | StoreError::Serialization(_) => {
                FailureKind::Service
            }
        }
    }

    /// Whether the user should be told about this failure
    pub fn is_user_visible(&self) -> bool {
        self.kind() != FailureKind::Stale
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            StoreError::Validation("bad".into()).kind(),
            FailureKind::Validation
        );
        assert_eq!(
            StoreError::Busy(ContextKey::Eligibility).kind(),
            FailureKind::Validation
        );
        assert_eq!(
            StoreError::Service(ServiceError::Timeout).kind(),
            FailureKind::Service
        );
        assert!(!StoreError::Stale(ContextKey::Eligibility).is_user_visible());
        assert!(!StoreError::Abandoned("m.jpg".into()).is_user_visible());
    }
}
