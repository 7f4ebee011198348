//! Error types for perch-core

use thiserror::Error;

/// Result type alias using perch-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Transient network failure categories eligible for retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// Remote call exceeded its deadline
    Timeout,
    /// No network connectivity at all
    NoConnectivity,
    /// Connection dropped mid-request
    ConnectionLost,
}

/// Errors that can occur in perch-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Entity not found in the local store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Transient network failure
    #[error("Network error ({kind:?}): {message}")]
    Network {
        kind: TransientKind,
        message: String,
    },

    /// Remote rejected a push because the submitted row version was stale
    #[error("Version conflict on {id}: submitted {submitted}, remote at {remote}")]
    VersionConflict {
        id: String,
        submitted: i64,
        remote: i64,
    },

    /// Remote rejected the credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Remote returned an unexpected response
    #[error("Remote error: {0}")]
    Remote(String),
}

impl Error {
    /// Timeout/connectivity failures that a later attempt may succeed on.
    pub const fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            Self::Network { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Fatal errors are never retried, whatever the attempt count.
    ///
    /// Version conflicts are fatal to the *retry loop* only: the orchestrator
    /// resolves them explicitly instead of resubmitting blind.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_)
                | Self::Validation(_)
                | Self::NotFound(_)
                | Self::VersionConflict { .. }
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Network {
                kind: TransientKind::Timeout,
                message: error.to_string(),
            }
        } else if error.is_connect() {
            Self::Network {
                kind: TransientKind::NoConnectivity,
                message: error.to_string(),
            }
        } else if error.is_request() || error.is_body() {
            Self::Network {
                kind: TransientKind::ConnectionLost,
                message: error.to_string(),
            }
        } else {
            Self::Remote(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_validation_are_fatal() {
        assert!(Error::Authentication("expired token".into()).is_fatal());
        assert!(Error::Validation("missing title".into()).is_fatal());
        assert!(Error::VersionConflict {
            id: "w1".into(),
            submitted: 2,
            remote: 3
        }
        .is_fatal());
    }

    #[test]
    fn network_errors_are_transient_not_fatal() {
        let error = Error::Network {
            kind: TransientKind::Timeout,
            message: "deadline exceeded".into(),
        };
        assert!(!error.is_fatal());
        assert_eq!(error.transient_kind(), Some(TransientKind::Timeout));
    }
}
