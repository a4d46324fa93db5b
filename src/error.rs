//! Error types for dealflow
//!
//! Centralized error handling using thiserror.
//!
//! The important distinction here is `StoreUnavailable` vs a plain miss:
//! store lookups return `Ok(None)` for "no such record" and
//! `Err(StoreUnavailable)` when the persistence layer itself failed. The
//! two must never be conflated — treating an outage as "not found" would
//! let the deduplicator create duplicate profiles.

use thiserror::Error;

/// All error types that can occur in dealflow
#[derive(Debug, Error)]
pub enum DealflowError {
    /// Persistence layer unreachable or corrupt
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Profile not found where one was required
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// An external collaborator (LLM, crawler, embedder) failed
    #[error("Collaborator failure in {stage}: {message}")]
    Collaborator { stage: String, message: String },

    /// Structured collaborator output failed to parse
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DealflowError {
    /// Shorthand for a collaborator failure at a named stage.
    pub fn collaborator(stage: impl Into<String>, message: impl Into<String>) -> Self {
        DealflowError::Collaborator {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// True when the persistence layer itself is down, as opposed to a
    /// recoverable per-candidate failure.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, DealflowError::StoreUnavailable(_))
    }
}

impl From<rusqlite::Error> for DealflowError {
    fn from(e: rusqlite::Error) -> Self {
        // Row-level misses are handled at the call site via Option; any
        // error that reaches this conversion is a real store failure.
        DealflowError::StoreUnavailable(e.to_string())
    }
}

/// Result type alias for dealflow operations
pub type Result<T> = std::result::Result<T, DealflowError>;
