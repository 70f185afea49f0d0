//! Error types for Roadmapper.
//!
//! Library crates use [`RoadmapError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Roadmapper operations.
#[derive(Debug, thiserror::Error)]
pub enum RoadmapError {
    /// Roadmap text could not be turned into a tree (no depth markers, empty body).
    #[error("format error: {message}")]
    Format { message: String },

    /// An external call failed or returned a non-success status.
    #[error("transport error: {0}")]
    Transport(String),

    /// A parsed roadmap is structurally unusable (too few topics, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON (de)serialization of a persisted blob failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The operation was cancelled or superseded before it finished.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RoadmapError>;

impl RoadmapError {
    /// Create a format error from any displayable message.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// Message suitable for showing to a student.
    ///
    /// Format errors are worded as a retry prompt since regenerating
    /// usually yields parseable text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Format { .. } => {
                "The roadmap could not be read. Please try again.".to_string()
            }
            Self::Validation { message } => message.clone(),
            Self::Cancelled => "Generation was cancelled.".to_string(),
            other => other.to_string(),
        }
    }
}
