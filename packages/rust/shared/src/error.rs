//! Error types for Prospector.
//!
//! Library crates use [`ProspectorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Prospector operations.
#[derive(Debug, thiserror::Error)]
pub enum ProspectorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Failed to build or use an HTTP client.
    #[error("network error: {0}")]
    Network(String),

    /// Page fetch failed (transport, HTTP status, or unusable body).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Search provider call failed.
    #[error("search error: {0}")]
    Search(String),

    /// Language-model transport or API error.
    #[error("model error: {0}")]
    Model(String),

    /// The model did not return a record matching the requested schema.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (malformed record, bad domain, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The workflow tried to leave a phase on an event the table does not allow.
    #[error("invalid transition: {event} in phase {phase}")]
    InvalidTransition { phase: String, event: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ProspectorError>;

impl ProspectorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a schema error from any displayable message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
