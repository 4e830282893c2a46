//! # bench-settings
//!
//! Connection, token and logging settings for the bench client.
//!
//! Layers, lowest priority first: [`BenchSettings::default()`], then
//! `~/.bench/settings.json` deep-merged on top, then `BENCH_*` environment
//! variables. The merged result is validated before use.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<BenchSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.bench/settings.json` with env var
/// overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> &'static BenchSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: BenchSettings) -> std::result::Result<(), BenchSettings> {
    SETTINGS.set(settings)
}
