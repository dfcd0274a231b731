//! # BlastGrid
//!
//! Drilling-pattern canvas engine for blast-hole layout:
//! - Drill point lattices with sequential `DH{n}` numbering
//! - Grid rendering with a bounded render cache and precise-mode intersections
//! - Spacing/burden estimation from surveyed hole positions
//! - Immutable pattern state with change notification
//! - Validated save/load/export against a key-value store
//!
//! ## Architecture
//!
//! BlastGrid is organized as a workspace with multiple crates:
//!
//! 1. **blastgrid-core** - Data model, errors, validation, event bus
//! 2. **blastgrid-settings** - Typed configuration with TOML/JSON persistence
//! 3. **blastgrid-designer** - Coordinates, renderers, state store, persistence
//! 4. **blastgrid** - Logging setup and the headless `blastgrid` binary

pub use blastgrid_core::{data, validation};
pub use blastgrid_designer as designer;
pub use blastgrid_settings as settings;

pub use blastgrid_core::{
    event_bus, validate, AppEvent, CanvasState, CursorMode, DrillPoint, EventBus, GridPosition,
    PatternData, PatternError, PatternMetadata, PatternSettings, PatternState, Result,
    SettingsPatch, UiState, ValidationResult,
};

pub use blastgrid_designer::{
    shared, CanvasGeometry, DrawingSurface, DrillPointFactory, DrillPointRenderer, FileStore,
    GridPatternSpec, GridPitch, GridPitchEstimator, GridRenderingEngine, KeyValueStore,
    MemoryStore, MemorySurface, PatternPersistenceGateway, PatternStateStore, ViewTransform,
};

pub use blastgrid_settings::{Config, ConfigError, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Environment variable selecting JSON log output when set to `1` or `true`.
pub const LOG_JSON_ENV: &str = "BLASTGRID_LOG_JSON";

fn json_logging_requested() -> bool {
    std::env::var(LOG_JSON_ENV)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"))
        .unwrap_or(false)
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - `RUST_LOG` environment variable support, `info` otherwise
/// - Pretty console output, or JSON lines when `BLASTGRID_LOG_JSON=1`
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json_logging_requested() {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            .pretty();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
