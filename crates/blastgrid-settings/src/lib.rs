//! BlastGrid Settings Crate
//!
//! Typed configuration for the canvas engine, render limits, pattern
//! defaults and pattern storage, with JSON/TOML persistence.

pub mod config;
pub mod error;

pub use config::{
    CanvasSettings, Config, PatternDefaults, RenderSettings, StorageSettings, APP_DIR_NAME,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
