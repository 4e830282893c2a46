//! Layered loading: defaults, then the JSON file, then `BENCH_*` variables.
//!
//! File values are merged key by key into the defaults. Nested objects
//! recurse, anything else (arrays included) replaces, and `null` leaves the
//! default in place.

use std::path::{Path, PathBuf};

use bench_core::TokenStrategy;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::BenchSettings;

/// `~/.bench/settings.json`, or under `/tmp` when `HOME` is unset.
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".bench").join("settings.json")
}

/// [`load_settings_from_path`] on [`settings_path`].
pub fn load_settings() -> Result<BenchSettings> {
    load_settings_from_path(&settings_path())
}

/// All three layers plus validation. A missing file is not an error; an
/// unreadable or malformed one is.
pub fn load_settings_from_path(path: &Path) -> Result<BenchSettings> {
    let mut settings = load_file_layers(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn load_file_layers(path: &Path) -> Result<BenchSettings> {
    let defaults = serde_json::to_value(BenchSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "reading settings file");
        let overlay: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        deep_merge(defaults, overlay)
    } else {
        debug!(?path, "no settings file");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Merge `overlay` into `base`, returning the combined value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay.into_iter().filter(|(_, v)| !v.is_null()) {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = base.insert(key, merged);
            }
            Value::Object(base)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Reject settings the channel cannot run with.
pub fn validate(settings: &BenchSettings) -> Result<()> {
    let conn = &settings.connection;
    if conn.outbound_queue == 0 {
        return Err(SettingsError::InvalidValue(
            "connection.outboundQueue must be at least 1".to_string(),
        ));
    }
    if conn.heartbeat_interval_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "connection.heartbeatIntervalMs must be positive".to_string(),
        ));
    }
    if conn.heartbeat_timeout_ms < conn.heartbeat_interval_ms {
        return Err(SettingsError::InvalidValue(format!(
            "connection.heartbeatTimeoutMs ({}) is shorter than the interval ({})",
            conn.heartbeat_timeout_ms, conn.heartbeat_interval_ms
        )));
    }
    if !(conn.url.starts_with("ws://") || conn.url.starts_with("wss://")) {
        return Err(SettingsError::InvalidValue(format!(
            "connection.url must be a ws:// or wss:// URL, got {}",
            conn.url
        )));
    }
    Ok(())
}

/// Overwrite fields from `BENCH_*` variables. Unparseable values are logged
/// and skipped.
pub fn apply_env_overrides(settings: &mut BenchSettings) {
    if let Some(v) = read_env("BENCH_URL", non_empty) {
        settings.connection.url = v;
    }
    if let Some(v) = read_env("BENCH_OUTBOUND_QUEUE", |v| parse_usize_range(v, 1, 65_536)) {
        settings.connection.outbound_queue = v;
    }
    if let Some(v) = read_env("BENCH_HEARTBEAT_INTERVAL_MS", |v| parse_u64_range(v, 100, 600_000)) {
        settings.connection.heartbeat_interval_ms = v;
    }
    if let Some(v) = read_env("BENCH_HEARTBEAT_TIMEOUT_MS", |v| parse_u64_range(v, 100, 3_600_000)) {
        settings.connection.heartbeat_timeout_ms = v;
    }
    if let Some(v) = read_env("BENCH_TOKEN_STRATEGY", |v| v.parse::<TokenStrategy>().ok()) {
        settings.tokens.strategy = v;
    }
    if let Some(v) = read_env("BENCH_LOG_LEVEL", non_empty) {
        settings.logging.level = v;
    }
    if let Some(v) = read_env("BENCH_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
}

/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, any case.
pub fn parse_bool(val: &str) -> Option<bool> {
    const TRUTHY: [&str; 4] = ["true", "1", "yes", "on"];
    const FALSY: [&str; 4] = ["false", "0", "no", "off"];
    let val = val.to_ascii_lowercase();
    if TRUTHY.contains(&val.as_str()) {
        Some(true)
    } else if FALSY.contains(&val.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// `val` as a `u64` in `min..=max`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    val.parse().ok().filter(|n| (min..=max).contains(n))
}

/// `val` as a `usize` in `min..=max`.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    val.parse().ok().filter(|n| (min..=max).contains(n))
}

fn non_empty(val: &str) -> Option<String> {
    (!val.is_empty()).then(|| val.to_string())
}

fn read_env<T>(name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse(&raw);
    if parsed.is_none() && !raw.is_empty() {
        warn!(key = name, value = %raw, "ignoring unparseable environment override");
    }
    parsed
}
