//! Unified error types for refact

use thiserror::Error;

/// Unified error type for all refact operations
#[derive(Error, Debug)]
pub enum RefactError {
    // Third-party API errors
    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    // LLM output errors
    #[error("Parse error: {0}")]
    Parse(String),

    // Lookup errors
    #[error("Not found: {0}")]
    NotFound(String),

    // Remote mirroring errors
    #[error("Partial sync: {committed} committed, {failed} failed")]
    PartialSync { committed: usize, failed: usize },

    // Workspace errors
    #[error("Path validation failed: {0}")]
    PathValidation(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl RefactError {
    /// Build an upstream error from a transport failure (no HTTP status)
    pub fn transport(err: impl std::fmt::Display) -> Self {
        RefactError::Upstream {
            status: 0,
            body: err.to_string(),
        }
    }
}

/// Result type alias using RefactError
pub type Result<T> = std::result::Result<T, RefactError>;
