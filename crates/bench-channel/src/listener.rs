//! Receiving side of the shared channel.

use bench_core::CommandMessage;

/// Something that wants the inbound messages addressed to its token.
///
/// Called on the transport task, outside any routing lock. Implementations
/// must not block.
pub trait Listener: Send + Sync {
    /// Handle one inbound message.
    fn on_message(&self, message: &CommandMessage);
}
