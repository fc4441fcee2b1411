//! Error types for issuekb.
//!
//! Library crates use [`IssueKbError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! The classification core never produces these errors; they come from
//! the collaborators around it (file loading, the refinement bridge, export).

use std::path::PathBuf;

/// Top-level error type for all issuekb operations.
#[derive(Debug, thiserror::Error)]
pub enum IssueKbError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed input data (e.g. an issue export that is not valid JSON).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Refinement bridge or extractor failure.
    #[error("refine error: {0}")]
    Refine(String),

    /// Output serialization or writing failure.
    #[error("export error: {0}")]
    Export(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty input, unsupported value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IssueKbError>;

impl IssueKbError {
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
