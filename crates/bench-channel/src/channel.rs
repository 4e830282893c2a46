//! The shared broadcast channel.
//!
//! One outbound queue feeds the transport task; one [`Dispatcher`] routes
//! everything the transport reads back. Invokers only ever see the
//! [`CommandChannel`] trait.

use std::sync::{Arc, Weak};

use bench_core::{CommandMessage, CorrelationToken};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatch::{Dispatcher, Subscription};
use crate::errors::{ChannelError, Result};
use crate::listener::Listener;

/// What an invoker needs from the shared connection.
pub trait CommandChannel: Send + Sync {
    /// Hand a message to the outbound queue.
    ///
    /// Returns once the message is queued, not once it is written.
    fn send(&self, message: CommandMessage) -> Result<()>;

    /// Register a listener for messages carrying `token`.
    fn subscribe(&self, token: &CorrelationToken, listener: Weak<dyn Listener>) -> Subscription;
}

/// Cloneable handle to the shared connection.
#[derive(Clone)]
pub struct SharedChannel {
    outbound: mpsc::Sender<CommandMessage>,
    dispatcher: Arc<Dispatcher>,
}

impl SharedChannel {
    /// Create a channel with an outbound queue of `capacity` messages.
    ///
    /// The receiver is the transport's end of the queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<CommandMessage>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let channel = Self {
            outbound,
            dispatcher: Arc::new(Dispatcher::new()),
        };
        (channel, rx)
    }

    /// Route an inbound message to its listeners.
    pub fn deliver(&self, message: &CommandMessage) -> usize {
        self.dispatcher.dispatch(message)
    }

    /// Fail every in-flight command with `reason`.
    pub fn broadcast_fault(&self, reason: &str) -> usize {
        self.dispatcher.broadcast_fault(reason)
    }

    /// The routing table.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Whether the transport end has gone away.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

impl CommandChannel for SharedChannel {
    fn send(&self, message: CommandMessage) -> Result<()> {
        let reference = message.reference.clone();
        match self.outbound.try_send(message) {
            Ok(()) => {
                debug!(reference, "message queued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(reference, "outbound queue full");
                Err(ChannelError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(reference, "outbound queue closed");
                Err(ChannelError::Closed)
            }
        }
    }

    fn subscribe(&self, token: &CorrelationToken, listener: Weak<dyn Listener>) -> Subscription {
        self.dispatcher.subscribe(token, listener)
    }
}
