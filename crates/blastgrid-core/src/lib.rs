//! # BlastGrid Core
//!
//! Core types for the drilling-pattern engine: drill points, pattern
//! settings and state, validation, the error taxonomy and the application
//! event bus.

pub mod cursor;
pub mod data;
pub mod error;
pub mod event_bus;
pub mod validation;

pub use cursor::CursorMode;

pub use data::{
    round2, CanvasState, DrillPoint, GridPosition, PatternData, PatternMetadata, PatternSettings,
    PatternState, SettingsPatch, UiState, COORDINATE_TOLERANCE, DEPTH_TOLERANCE,
    DRILL_ID_PREFIX, PATTERN_SCHEMA_VERSION,
};

pub use error::{PatternError, Result, StorageError};

pub use validation::{
    validate, ValidationCode, ValidationIssue, ValidationResult, MAX_DEPTH, MAX_DRILL_POINTS,
};

// Re-export event bus for convenience
pub use event_bus::{
    event_bus, AppEvent, EventBus, EventBusError, EventCategory, EventFilter, PatternEvent,
    PersistenceEvent, PrimitiveKind, RenderEvent, SubscriptionId,
};
