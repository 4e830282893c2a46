//! Why a settings load failed.

use thiserror::Error;

/// Failure while loading or validating [`crate::BenchSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not JSON or does not match the settings shape.
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    /// The merged settings failed validation.
    #[error("rejected setting: {0}")]
    InvalidValue(String),
}

/// Settings result alias.
pub type Result<T> = std::result::Result<T, SettingsError>;
