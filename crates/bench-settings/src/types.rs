//! Settings types.
//!
//! All structs use camelCase JSON and `#[serde(default)]`, so a partial
//! settings file only needs the keys it overrides.

use std::time::Duration;

use bench_core::TokenStrategy;
use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BenchSettings {
    /// Shared connection settings.
    pub connection: ConnectionSettings,
    /// Correlation token settings.
    pub tokens: TokenSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Shared connection to the command server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// WebSocket endpoint.
    pub url: String,
    /// Capacity of the outbound message queue.
    pub outbound_queue: usize,
    /// Ping interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Silence after which the connection counts as lost, in milliseconds.
    pub heartbeat_timeout_ms: u64,
    /// Handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8099/wsoapi".to_string(),
            outbound_queue: 64,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ConnectionSettings {
    /// Ping interval.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Silence timeout.
    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    /// Handshake timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Correlation token settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenSettings {
    /// Suffix strategy.
    pub strategy: TokenStrategy,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level filter; `RUST_LOG` wins when set.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = BenchSettings::default();
        assert_eq!(settings.connection.url, "ws://127.0.0.1:8099/wsoapi");
        assert_eq!(settings.connection.outbound_queue, 64);
        assert_eq!(settings.connection.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(settings.connection.heartbeat_timeout(), Duration::from_secs(90));
        assert_eq!(settings.tokens.strategy, TokenStrategy::Random);
        assert_eq!(settings.logging.level, "warn");
        assert!(!settings.logging.json);
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(BenchSettings::default()).unwrap();
        assert!(value["connection"]["outboundQueue"].is_number());
        assert!(value["connection"]["heartbeatIntervalMs"].is_number());
        assert_eq!(value["tokens"]["strategy"], "random");
    }
}
