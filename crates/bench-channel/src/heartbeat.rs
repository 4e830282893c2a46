//! Liveness tracking for the shared connection.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks when the peer was last heard from.
///
/// Any inbound frame counts as a sign of life, pongs included.
#[derive(Debug)]
pub struct Liveness {
    last_seen: Instant,
    timeout: Duration,
}

impl Liveness {
    /// Start tracking now.
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_seen: Instant::now(),
            timeout,
        }
    }

    /// Record activity from the peer.
    pub fn mark_alive(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Time since the peer was last heard from.
    pub fn silence(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Whether the silence has exceeded the timeout.
    pub fn is_expired(&self) -> bool {
        self.silence() > self.timeout
    }
}
