//! Structured logging with `tracing`.
//!
//! Everything in the workspace logs through `tracing` macros with structured
//! fields (`reference`, `token`, `command`). The binary installs the
//! subscriber once at startup; libraries never do.

use std::io::Stderr;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::fmt::format::{DefaultFields, Format};

type StderrBuilder = SubscriberBuilder<DefaultFields, Format, EnvFilter, fn() -> Stderr>;

fn builder(level: &str) -> StderrBuilder {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr as fn() -> Stderr)
}

/// Compact human-readable lines on stderr.
///
/// `RUST_LOG` takes precedence over `level`. Later calls are no-ops.
pub fn init_subscriber(level: &str) {
    // already-set global subscriber is fine
    let _ = builder(level).compact().try_init();
}

/// One JSON object per event on stderr. Same filtering as [`init_subscriber`].
pub fn init_json_subscriber(level: &str) {
    let _ = builder(level).json().try_init();
}
