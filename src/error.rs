//! Error types for the campus-link client.
//!
//! All fallible operations return [`Result`]. Channel-lifecycle failures
//! (connect errors, dropped sockets) never surface here: they are absorbed
//! by the reconnect loop and only observable through channel status updates.
//! Store mutations are the one place where errors reach interactive code
//! paths, carrying the service's own classification so callers can tell a
//! uniqueness violation apart from a generic failure.

use thiserror::Error;

use crate::models::StoreErrorBody;

/// Errors produced by the campus-link client.
#[derive(Error, Debug)]
pub enum CampusLinkError {
    /// Invalid client configuration (bad base URL, missing required options).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Authentication failed or credentials are missing.
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// WebSocket transport failure (connect, frame, or protocol level).
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// An operation exceeded its configured timeout.
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Failed to serialize or parse a wire payload.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// HTTP transport failure from the underlying client.
    #[error("HTTP transport error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The store rejected a request; the body carries the service's
    /// error classification.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreErrorBody),

    /// A point read matched no row in the named collection.
    #[error("no matching {0} row")]
    NotFound(String),

    /// Invariant violation inside the client itself.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CampusLinkError {
    /// Returns `true` when this error is a store uniqueness violation,
    /// e.g. a second vote for the same `(poll, user)` pair.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::StoreError(body) if body.is_unique_violation())
    }
}

impl From<serde_json::Error> for CampusLinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CampusLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_classification() {
        let body = StoreErrorBody {
            code: "23505".to_string(),
            message: "duplicate key value violates unique constraint".to_string(),
            details: None,
        };
        let err = CampusLinkError::StoreError(body);
        assert!(err.is_unique_violation());

        let other = CampusLinkError::StoreError(StoreErrorBody {
            code: "42501".to_string(),
            message: "permission denied".to_string(),
            details: None,
        });
        assert!(!other.is_unique_violation());
        assert!(!CampusLinkError::TimeoutError("5s".into()).is_unique_violation());
    }

    #[test]
    fn test_display_includes_store_code() {
        let err = CampusLinkError::StoreError(StoreErrorBody {
            code: "23505".to_string(),
            message: "duplicate key".to_string(),
            details: None,
        });
        let text = err.to_string();
        assert!(text.contains("23505"), "display was: {}", text);
    }
}
