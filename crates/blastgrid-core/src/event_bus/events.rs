//! Event type definitions for the event bus.
//!
//! Events are grouped by the component that emits them. They are cloneable
//! and serializable so a session can be logged or replayed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::data::{CanvasState, DrillPoint, PatternSettings};

/// Root event enum for all application events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AppEvent {
    /// Pattern state mutations
    Pattern(PatternEvent),
    /// Grid and point rendering
    Render(RenderEvent),
    /// Save/load/export traffic
    Persistence(PersistenceEvent),
}

impl AppEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            AppEvent::Pattern(_) => EventCategory::Pattern,
            AppEvent::Render(_) => EventCategory::Render,
            AppEvent::Persistence(_) => EventCategory::Persistence,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            AppEvent::Pattern(e) => e.description(),
            AppEvent::Render(e) => e.description(),
            AppEvent::Persistence(e) => e.description(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Pattern state events.
    Pattern,
    /// Rendering events.
    Render,
    /// Persistence events.
    Persistence,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Pattern => write!(f, "Pattern"),
            EventCategory::Render => write!(f, "Render"),
            EventCategory::Persistence => write!(f, "Persistence"),
        }
    }
}

/// Pattern state events, emitted by the pattern store after each mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PatternEvent {
    /// A drill point was added.
    PointAdded {
        /// The new point.
        point: DrillPoint,
    },
    /// A drill point was replaced.
    PointUpdated {
        /// The point after the update.
        point: DrillPoint,
    },
    /// A drill point was removed.
    PointRemoved {
        /// Id of the removed point.
        id: String,
        /// Whether the removal cleared the selection.
        was_selected: bool,
    },
    /// Global settings changed.
    SettingsChanged {
        /// The settings after the change.
        settings: PatternSettings,
    },
    /// Selection changed.
    SelectionChanged {
        /// Id of the selected point, if any.
        id: Option<String>,
    },
    /// Canvas view changed (zoom, pan, drag).
    CanvasChanged {
        /// The canvas state after the change.
        canvas: CanvasState,
    },
    /// One or more UI flags changed.
    UiChanged,
    /// All points were removed.
    Cleared,
    /// A stored pattern replaced the current one.
    Loaded {
        /// Number of points in the loaded pattern.
        point_count: usize,
    },
    /// State was reset to defaults.
    Reset,
    /// Duplicate-placement message shown or cleared.
    DuplicateMessage {
        /// The message, or `None` once it was cleared.
        message: Option<String>,
    },
    /// Saved flag toggled.
    SavedChanged {
        /// Whether the pattern is marked as saved.
        is_saved: bool,
    },
}

impl PatternEvent {
    fn description(&self) -> String {
        match self {
            PatternEvent::PointAdded { point } => format!("Point added: {}", point),
            PatternEvent::PointUpdated { point } => format!("Point updated: {}", point),
            PatternEvent::PointRemoved { id, was_selected } => {
                if *was_selected {
                    format!("Point removed: {} (selection cleared)", id)
                } else {
                    format!("Point removed: {}", id)
                }
            }
            PatternEvent::SettingsChanged { settings } => format!(
                "Settings: spacing={} burden={} depth={}",
                settings.spacing, settings.burden, settings.depth
            ),
            PatternEvent::SelectionChanged { id } => match id {
                Some(id) => format!("Selected {}", id),
                None => "Selection cleared".to_string(),
            },
            PatternEvent::CanvasChanged { canvas } => format!(
                "Canvas: scale={:.2} pan=({:.0}, {:.0})",
                canvas.scale, canvas.pan_offset_x, canvas.pan_offset_y
            ),
            PatternEvent::UiChanged => "UI state changed".to_string(),
            PatternEvent::Cleared => "All points cleared".to_string(),
            PatternEvent::Loaded { point_count } => {
                format!("Pattern loaded with {} points", point_count)
            }
            PatternEvent::Reset => "Pattern state reset".to_string(),
            PatternEvent::DuplicateMessage { message } => match message {
                Some(message) => format!("Duplicate: {}", message),
                None => "Duplicate message cleared".to_string(),
            },
            PatternEvent::SavedChanged { is_saved } => {
                if *is_saved {
                    "Pattern marked as saved".to_string()
                } else {
                    "Pattern modified".to_string()
                }
            }
        }
    }
}

/// Kind of primitive whose generation budget was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// Minor and major grid lines.
    GridLines,
    /// Precise-mode intersection markers.
    Intersections,
}

/// Rendering events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RenderEvent {
    /// The grid was drawn.
    GridRendered {
        /// Number of primitives on the surface after the render.
        primitives: usize,
        /// Whether the primitives came from the render cache.
        cache_hit: bool,
        /// Wall-clock time of the render.
        duration: Duration,
    },
    /// Generation stopped early at the primitive budget.
    PrimitiveLimitReached {
        /// Which primitives hit the budget.
        kind: PrimitiveKind,
        /// The budget.
        limit: usize,
    },
    /// The render cache was dropped.
    CacheInvalidated,
}

impl RenderEvent {
    fn description(&self) -> String {
        match self {
            RenderEvent::GridRendered {
                primitives,
                cache_hit,
                duration,
            } => format!(
                "Grid rendered: {} primitives in {:?}{}",
                primitives,
                duration,
                if *cache_hit { " (cached)" } else { "" }
            ),
            RenderEvent::PrimitiveLimitReached { kind, limit } => {
                format!("{:?} limit reached ({})", kind, limit)
            }
            RenderEvent::CacheInvalidated => "Render cache invalidated".to_string(),
        }
    }
}

/// Persistence events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PersistenceEvent {
    /// A pattern was written.
    Saved {
        /// Storage key.
        key: String,
    },
    /// A pattern was read.
    Loaded {
        /// Storage key.
        key: String,
    },
    /// A pattern was exported.
    Exported {
        /// Number of exported points.
        point_count: usize,
    },
    /// A stored pattern was removed.
    Deleted {
        /// Storage key.
        key: String,
    },
    /// An operation failed.
    Failed {
        /// Operation name (save, load, export, ...).
        operation: String,
        /// Error message.
        error: String,
    },
}

impl PersistenceEvent {
    fn description(&self) -> String {
        match self {
            PersistenceEvent::Saved { key } => format!("Pattern saved: {}", key),
            PersistenceEvent::Loaded { key } => format!("Pattern loaded: {}", key),
            PersistenceEvent::Exported { point_count } => {
                format!("Pattern exported with {} points", point_count)
            }
            PersistenceEvent::Deleted { key } => format!("Pattern deleted: {}", key),
            PersistenceEvent::Failed { operation, error } => {
                format!("{} failed: {}", operation, error)
            }
        }
    }
}
