//! Configuration errors.
//!
//! [`SettingsError`] covers reading and writing config files;
//! [`ConfigError`] covers values that fail [`Config::validate`](crate::Config::validate).

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot read config {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Cannot write config {path}: {reason}")]
    Save { path: String, reason: String },

    /// No platform config directory to default to
    #[error("Config directory unavailable: {0}")]
    ConfigDirectory(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Malformed JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed TOML config: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Cannot encode TOML config: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
}

/// A config value that cannot be used.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// File extension other than `.toml` or `.json`
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("{key} = {value} is out of range")]
    ValueOutOfRange { key: String, value: String },

    /// Values that are fine alone but contradict each other
    #[error("{0}")]
    Inconsistent(String),
}

impl ConfigError {
    pub(crate) fn out_of_range(key: &str, value: impl ToString) -> Self {
        ConfigError::ValueOutOfRange {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

pub type SettingsResult<T> = Result<T, SettingsError>;

pub type ConfigResult<T> = Result<T, ConfigError>;
