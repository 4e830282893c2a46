//! Channel error types.

use thiserror::Error;

/// Errors raised by the shared channel and its transport.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The outbound queue has no free slot.
    #[error("outbound queue is full")]
    QueueFull,
    /// The transport has stopped; nothing will be sent.
    #[error("shared connection is closed")]
    Closed,
    /// The WebSocket handshake failed.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        /// Endpoint that was dialed.
        url: String,
        /// Underlying WebSocket error.
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    /// The WebSocket handshake did not finish in time.
    #[error("timed out connecting to {url}")]
    ConnectTimeout {
        /// Endpoint that was dialed.
        url: String,
    },
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
