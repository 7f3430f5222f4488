//! Error types for ChannelScope.
//!
//! Library crates use [`ChannelScopeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ChannelScope operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelScopeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the data source.
    #[error("network error: {0}")]
    Network(String),

    /// Response or payload parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Recommendation oracle error (transport or protocol).
    #[error("oracle error: {0}")]
    Oracle(String),

    /// Artifact rendering error.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Item collection returned nothing for the channel.
    #[error("no items found for channel {channel_id}")]
    DataUnavailable { channel_id: String },

    /// A selection index does not address an existing recommendation.
    #[error("selection index {index} is out of range ({available} recommendations available)")]
    SelectionOutOfRange { index: usize, available: usize },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ChannelScopeError>;

impl ChannelScopeError {
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
