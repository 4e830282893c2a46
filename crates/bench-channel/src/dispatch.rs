//! Token-keyed routing of inbound messages.
//!
//! Each listener is registered under its correlation token. An inbound
//! message goes to the listeners registered under its `reference`; a message
//! carrying the global fault token goes to every registered listener.
//!
//! Listeners are held weakly and callbacks run after the routing lock is
//! released, so a listener may subscribe or drop a [`Subscription`] from
//! inside `on_message` without deadlocking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bench_core::{CommandMessage, CorrelationToken};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::listener::Listener;

struct Route {
    id: u64,
    listener: Weak<dyn Listener>,
}

/// Routing table shared by the channel and every [`Subscription`].
pub struct Dispatcher {
    routes: Mutex<HashMap<String, Vec<Route>>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    /// Create an empty routing table.
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `listener` under `token`.
    ///
    /// The registration lives as long as the returned handle.
    pub fn subscribe(
        self: &Arc<Self>,
        token: &CorrelationToken,
        listener: Weak<dyn Listener>,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.routes
            .lock()
            .entry(token.as_str().to_string())
            .or_default()
            .push(Route { id, listener });
        debug!(token = %token, id, "listener subscribed");
        Subscription {
            dispatcher: Arc::clone(self),
            token: token.as_str().to_string(),
            id,
        }
    }

    /// Route one inbound message. Returns how many listeners received it.
    pub fn dispatch(&self, message: &CommandMessage) -> usize {
        let targets = if message.is_global_fault() {
            self.collect_all()
        } else {
            self.collect_for(&message.reference)
        };

        if targets.is_empty() {
            debug!(reference = %message.reference, "no listener for inbound message, dropping");
            return 0;
        }

        trace!(reference = %message.reference, recipients = targets.len(), "dispatching");
        for listener in &targets {
            listener.on_message(message);
        }
        targets.len()
    }

    /// Deliver a synthesized global fault to every listener.
    pub fn broadcast_fault(&self, reason: &str) -> usize {
        debug!(reason, "broadcasting global fault");
        self.dispatch(&CommandMessage::global_fault(reason))
    }

    /// Number of live registrations.
    pub fn listener_count(&self) -> usize {
        self.routes
            .lock()
            .values()
            .flatten()
            .filter(|route| route.listener.strong_count() > 0)
            .count()
    }

    fn collect_for(&self, reference: &str) -> Vec<Arc<dyn Listener>> {
        let mut routes = self.routes.lock();
        let Some(entries) = routes.get_mut(reference) else {
            return Vec::new();
        };
        let live = upgrade_and_prune(entries);
        if entries.is_empty() {
            let _ = routes.remove(reference);
        }
        live
    }

    fn collect_all(&self) -> Vec<Arc<dyn Listener>> {
        let mut routes = self.routes.lock();
        let mut live = Vec::new();
        for entries in routes.values_mut() {
            live.extend(upgrade_and_prune(entries));
        }
        routes.retain(|_, entries| !entries.is_empty());
        live
    }

    fn unsubscribe(&self, token: &str, id: u64) {
        let mut routes = self.routes.lock();
        if let Some(entries) = routes.get_mut(token) {
            entries.retain(|route| route.id != id);
            if entries.is_empty() {
                let _ = routes.remove(token);
            }
        }
        debug!(token, id, "listener unsubscribed");
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn upgrade_and_prune(entries: &mut Vec<Route>) -> Vec<Arc<dyn Listener>> {
    let mut live = Vec::with_capacity(entries.len());
    entries.retain(|route| match route.listener.upgrade() {
        Some(listener) => {
            live.push(listener);
            true
        }
        None => false,
    });
    live
}

/// Registration handle. Dropping it removes the listener from routing.
#[must_use = "dropping a Subscription unregisters the listener immediately"]
pub struct Subscription {
    dispatcher: Arc<Dispatcher>,
    token: String,
    id: u64,
}

impl Subscription {
    /// Token the listener is registered under.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispatcher.unsubscribe(&self.token, self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("token", &self.token)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
