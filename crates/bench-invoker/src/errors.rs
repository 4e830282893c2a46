//! Invoker error types.

use bench_channel::ChannelError;
use thiserror::Error;

/// Errors returned by invoker operations.
#[derive(Debug, Error)]
pub enum InvokerError {
    /// A command is already in flight for this invoker.
    #[error("a command is already running")]
    AlreadyRunning,
    /// The shared channel refused the message.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Result type for invoker operations.
pub type Result<T> = std::result::Result<T, InvokerError>;
