//! Error types for Docweaver.
//!
//! Library crates use [`DocweaverError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Docweaver operations.
#[derive(Debug, thiserror::Error)]
pub enum DocweaverError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during search or download.
    #[error("network error: {0}")]
    Network(String),

    /// Structured-data parsing error (planner output, search payloads).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Web or image search collaborator error.
    #[error("search error: {0}")]
    Search(String),

    /// Completion service error (endpoint, API, or response shape).
    #[error("completion error: {0}")]
    Completion(String),

    /// Local knowledge store error (ingestion or query).
    #[error("store error: {0}")]
    Store(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty outline, invalid structure, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocweaverError>;

impl DocweaverError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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
