//! Pattern state aggregate
//!
//! `PatternState` is replaced wholesale on every mutation. The point list is
//! held behind an `Arc<[DrillPoint]>` so consumers can detect a changed list
//! with `Arc::ptr_eq` instead of comparing every point.

use super::{DrillPoint, PatternData, PatternSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Schema version written into pattern metadata.
pub const PATTERN_SCHEMA_VERSION: &str = "1.0";

/// A position in grid space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: f64,
    pub y: f64,
}

impl GridPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Canvas view sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    pub scale: f64,
    pub pan_offset_x: f64,
    pub pan_offset_y: f64,
    pub is_dragging: bool,
    pub is_initialized: bool,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan_offset_x: 0.0,
            pan_offset_y: 0.0,
            is_dragging: false,
            is_initialized: false,
        }
    }
}

/// UI flags sub-state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub is_hole_placement_mode: bool,
    pub is_precise_mode: bool,
    pub is_fullscreen: bool,
    pub is_saved: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub cursor_position: Option<GridPosition>,
    #[serde(default)]
    pub duplicate_message: Option<String>,
    /// Placement help overlay
    #[serde(default)]
    pub show_instructions: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            is_hole_placement_mode: false,
            is_precise_mode: false,
            is_fullscreen: false,
            is_saved: true,
            is_read_only: false,
            cursor_position: None,
            duplicate_message: None,
            show_instructions: false,
        }
    }
}

/// Pattern ownership and revision metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMetadata {
    pub project_id: u64,
    pub site_id: u64,
    /// Serialized as an RFC 3339 string
    pub last_modified: DateTime<Utc>,
    pub version: String,
}

impl PatternMetadata {
    pub fn new(project_id: u64, site_id: u64) -> Self {
        Self {
            project_id,
            site_id,
            last_modified: Utc::now(),
            version: PATTERN_SCHEMA_VERSION.to_string(),
        }
    }

    /// Storage key for this pattern, `{projectId}:{siteId}`.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.project_id, self.site_id)
    }
}

impl Default for PatternMetadata {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// The complete drilling-pattern aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternState {
    pub drill_points: Arc<[DrillPoint]>,
    #[serde(default)]
    pub selected_point: Option<DrillPoint>,
    pub settings: PatternSettings,
    #[serde(default)]
    pub canvas: CanvasState,
    #[serde(default)]
    pub ui: UiState,
    pub metadata: PatternMetadata,
}

impl Default for PatternState {
    fn default() -> Self {
        Self {
            drill_points: Arc::from(Vec::new()),
            selected_point: None,
            settings: PatternSettings::default(),
            canvas: CanvasState::default(),
            ui: UiState::default(),
            metadata: PatternMetadata::default(),
        }
    }
}

impl PatternState {
    /// Fresh state for a project/site with the given settings.
    pub fn new(project_id: u64, site_id: u64, settings: PatternSettings) -> Self {
        Self {
            settings,
            metadata: PatternMetadata::new(project_id, site_id),
            ..Default::default()
        }
    }

    /// Replace the point list, keeping everything else.
    pub fn with_points(mut self, points: Vec<DrillPoint>) -> Self {
        self.drill_points = Arc::from(points);
        self
    }

    pub fn point_count(&self) -> usize {
        self.drill_points.len()
    }

    pub fn find_point(&self, id: &str) -> Option<&DrillPoint> {
        self.drill_points.iter().find(|p| p.id == id)
    }

    /// Points whose depth deviates from the global depth.
    pub fn points_with_custom_depths(&self) -> Vec<DrillPoint> {
        self.drill_points
            .iter()
            .filter(|p| p.has_custom_depth(self.settings.depth))
            .cloned()
            .collect()
    }

    /// Deep-copied `{drillPoints, settings}` projection.
    pub fn to_pattern_data(&self) -> PatternData {
        PatternData {
            drill_points: self.drill_points.to_vec(),
            settings: self.settings,
        }
    }
}
