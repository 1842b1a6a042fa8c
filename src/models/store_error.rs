use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Postgres error code for a unique-constraint violation, reported by the
/// store when e.g. a second vote is inserted for the same `(poll, user)`.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Error body returned by the store on a rejected request.
///
/// The `code` preserves the service's classification so interactive callers
/// can branch on it (already voted vs. generic failure) instead of showing
/// a blanket error.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct StoreErrorBody {
    /// Error code (Postgres SQLSTATE or an HTTP status fallback).
    pub code: String,

    /// Human-readable error message.
    pub message: String,

    /// Optional additional details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl StoreErrorBody {
    /// Returns `true` when the store rejected the request for violating a
    /// unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        self.code == UNIQUE_VIOLATION_CODE
    }
}
