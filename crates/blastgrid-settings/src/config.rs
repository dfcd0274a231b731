//! Configuration for BlastGrid
//!
//! Configuration is organized into sections:
//! - Canvas geometry (pixels per grid unit, ruler sizes, marker radius, zoom range)
//! - Render limits (primitive budgets, cache size)
//! - Pattern defaults (drilling parameters, point limit, message timing)
//! - Storage location for the file-backed pattern store
//!
//! Files are JSON or TOML, chosen by extension, and validated on load and
//! before save.

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use blastgrid_core::{PatternSettings, MAX_DEPTH, MAX_DRILL_POINTS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name used under the platform config and data directories.
pub const APP_DIR_NAME: &str = "blastgrid";

/// Canvas geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    /// Pixels per grid unit at scale 1.0
    pub grid_size: f64,
    /// Width of the vertical ruler in pixels
    pub ruler_width: f64,
    /// Height of the horizontal ruler in pixels
    pub ruler_height: f64,
    /// Drill point marker radius in pixels
    pub point_radius: f64,
    /// Base grid line colour
    pub grid_color: String,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            grid_size: 50.0,
            ruler_width: 50.0,
            ruler_height: 30.0,
            point_radius: 8.0,
            grid_color: "#e0e0e0".to_string(),
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

impl CanvasSettings {
    /// Clamp a zoom factor into the configured range.
    pub fn clamp_zoom(&self, scale: f64) -> f64 {
        scale.clamp(self.min_zoom, self.max_zoom)
    }
}

/// Render limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Maximum grid lines per render
    pub max_grid_lines: usize,
    /// Maximum cached renders
    pub max_cache_size: usize,
    pub caching_enabled: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_grid_lines: 1000,
            max_cache_size: 10,
            caching_enabled: true,
        }
    }
}

impl RenderSettings {
    /// Intersection marker budget, a quarter of the line budget.
    pub fn max_intersections(&self) -> usize {
        self.max_grid_lines / 4
    }
}

/// Pattern editing defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternDefaults {
    pub max_points: usize,
    /// How long the duplicate-placement message stays visible
    pub duplicate_message_ms: u64,
    /// Settings given to new patterns
    pub settings: PatternSettings,
}

impl Default for PatternDefaults {
    fn default() -> Self {
        Self {
            max_points: MAX_DRILL_POINTS,
            duplicate_message_ms: 3000,
            settings: PatternSettings::default(),
        }
    }
}

impl PatternDefaults {
    pub fn duplicate_message_timeout(&self) -> Duration {
        Duration::from_millis(self.duplicate_message_ms)
    }
}

/// Storage location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding one JSON file per stored pattern
    pub directory: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            directory: base.join(APP_DIR_NAME).join("patterns"),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub canvas: CanvasSettings,
    pub render: RenderSettings,
    pub pattern: PatternDefaults,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> ConfigResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        Some(other) => Err(ConfigError::UnsupportedFormat(other.to_string())),
        None => Err(ConfigError::UnsupportedFormat(
            "config file must be .json or .toml".to_string(),
        )),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location, `<config dir>/blastgrid/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join("config.toml"))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no platform config directory".to_string())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load config from file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let format = format_of(path)?;

        let content = match format {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| SettingsError::Save {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let canvas = &self.canvas;
        if canvas.grid_size <= 0.0 {
            return Err(ConfigError::out_of_range("canvas.grid_size", canvas.grid_size));
        }
        if canvas.ruler_width < 0.0 {
            return Err(ConfigError::out_of_range("canvas.ruler_width", canvas.ruler_width));
        }
        if canvas.ruler_height < 0.0 {
            return Err(ConfigError::out_of_range("canvas.ruler_height", canvas.ruler_height));
        }
        if canvas.point_radius <= 0.0 {
            return Err(ConfigError::out_of_range("canvas.point_radius", canvas.point_radius));
        }
        if canvas.grid_color.trim().is_empty() {
            return Err(ConfigError::out_of_range("canvas.grid_color", "\"\""));
        }
        if canvas.min_zoom <= 0.0 {
            return Err(ConfigError::out_of_range("canvas.min_zoom", canvas.min_zoom));
        }
        if canvas.min_zoom >= canvas.max_zoom {
            return Err(ConfigError::Inconsistent(format!(
                "canvas.min_zoom ({}) must be below canvas.max_zoom ({})",
                canvas.min_zoom, canvas.max_zoom
            )));
        }

        if self.render.max_grid_lines == 0 {
            return Err(ConfigError::out_of_range("render.max_grid_lines", 0));
        }
        if self.render.max_cache_size == 0 {
            return Err(ConfigError::out_of_range("render.max_cache_size", 0));
        }

        let defaults = &self.pattern.settings;
        if defaults.spacing <= 0.0 {
            return Err(ConfigError::out_of_range("pattern.settings.spacing", defaults.spacing));
        }
        if defaults.burden <= 0.0 {
            return Err(ConfigError::out_of_range("pattern.settings.burden", defaults.burden));
        }
        if defaults.depth <= 0.0 || defaults.depth > MAX_DEPTH {
            return Err(ConfigError::out_of_range("pattern.settings.depth", defaults.depth));
        }
        if self.pattern.max_points == 0 {
            return Err(ConfigError::out_of_range("pattern.max_points", 0));
        }

        Ok(())
    }
}
