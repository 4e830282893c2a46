//! Core error types.

use thiserror::Error;

/// Errors raised while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A frame was not a valid command message.
    #[error("failed to decode command message: {0}")]
    Decode(#[source] serde_json::Error),
    /// A command message could not be serialized.
    #[error("failed to encode command message: {0}")]
    Encode(#[source] serde_json::Error),
    /// A binary frame did not contain UTF-8 text.
    #[error("frame is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
