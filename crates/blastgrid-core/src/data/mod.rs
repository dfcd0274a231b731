//! Data models for drill points, pattern settings and pattern state
//!
//! This module provides:
//! - Drill points in grid space (meters) with per-hole drilling parameters
//! - Global pattern settings (spacing, burden, depth, charge geometry)
//! - The pattern state aggregate owned by the pattern store
//! - The export payload consumed by the blast-sequence designer
//!
//! All types serialize with camelCase keys so that stored patterns and export
//! payloads keep the wire layout used by the web client.

pub mod pattern_state;

pub use pattern_state::{
    CanvasState, GridPosition, PatternMetadata, PatternState, UiState, PATTERN_SCHEMA_VERSION,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used when comparing a hole depth against the global depth.
pub const DEPTH_TOLERANCE: f64 = 0.01;

/// Tolerance below which two holes are considered to occupy the same position.
pub const COORDINATE_TOLERANCE: f64 = 0.01;

/// Prefix of generated drill hole identifiers (`DH1`, `DH2`, ...).
pub const DRILL_ID_PREFIX: &str = "DH";

/// Round a grid coordinate to the canonical 2-decimal precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A single blast hole in grid space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillPoint {
    /// Stable short code, unique within a pattern (e.g. `DH1`)
    pub id: String,
    /// Grid-space X coordinate in meters
    pub x: f64,
    /// Grid-space Y coordinate in meters
    pub y: f64,
    /// Hole depth in meters
    pub depth: f64,
    /// Spacing the hole was placed with
    pub spacing: f64,
    /// Burden the hole was placed with
    pub burden: f64,
    /// Stemming length in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stemming: Option<f64>,
    /// Sub-drill length in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_drill: Option<f64>,
}

impl DrillPoint {
    /// Create a drill point with explicit coordinates and drilling parameters.
    pub fn new(
        id: impl Into<String>,
        x: f64,
        y: f64,
        depth: f64,
        spacing: f64,
        burden: f64,
    ) -> Self {
        debug_assert!(
            x.is_finite() && y.is_finite(),
            "drill point coordinates must be finite: x={x}, y={y}"
        );
        Self {
            id: id.into(),
            x,
            y,
            depth,
            spacing,
            burden,
            stemming: None,
            sub_drill: None,
        }
    }

    /// Set stemming and sub-drill lengths.
    pub fn with_charge(mut self, stemming: Option<f64>, sub_drill: Option<f64>) -> Self {
        self.stemming = stemming;
        self.sub_drill = sub_drill;
        self
    }

    /// Whether this hole's depth deviates from `global_depth` beyond tolerance.
    pub fn has_custom_depth(&self, global_depth: f64) -> bool {
        // A difference of exactly 0.01 must not be pushed over the
        // tolerance by binary rounding.
        strip_float_noise(self.depth - global_depth).abs() > DEPTH_TOLERANCE
    }

    /// Whether this hole sits within coordinate tolerance of `(x, y)`.
    pub fn is_at(&self, x: f64, y: f64) -> bool {
        (self.x - x).abs() < COORDINATE_TOLERANCE && (self.y - y).abs() < COORDINATE_TOLERANCE
    }

    /// Numeric suffix of a `DH{n}` identifier, if the id follows that layout.
    pub fn numeric_suffix(&self) -> Option<u64> {
        self.id.strip_prefix(DRILL_ID_PREFIX)?.parse().ok()
    }

    /// Euclidean distance to another hole, in grid units.
    pub fn distance_to(&self, other: &DrillPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl fmt::Display for DrillPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2}, {:.2})", self.id, self.x, self.y)
    }
}

/// Round to 1e-6, dropping representation error such as `10.01 - 10.0`.
fn strip_float_noise(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Global drilling parameters of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSettings {
    /// Pitch along the X axis in meters
    pub spacing: f64,
    /// Pitch along the Y axis in meters
    pub burden: f64,
    /// Default hole depth in meters
    pub depth: f64,
    /// Hole diameter in millimeters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
    /// Stemming length in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stemming: Option<f64>,
    /// Sub-drill length in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_drill: Option<f64>,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            spacing: 3.0,
            burden: 2.5,
            depth: 10.0,
            diameter: Some(115.0),
            stemming: Some(3.0),
            sub_drill: Some(0.5),
        }
    }
}

impl PatternSettings {
    /// Create settings with the three mandatory parameters.
    pub fn new(spacing: f64, burden: f64, depth: f64) -> Self {
        Self {
            spacing,
            burden,
            depth,
            diameter: None,
            stemming: None,
            sub_drill: None,
        }
    }

    /// Whether spacing, burden and depth are within their allowed ranges.
    pub fn is_valid(&self) -> bool {
        self.spacing > 0.0 && self.burden > 0.0 && self.depth > 0.0 && self.depth <= 50.0
    }
}

/// Partial settings update; `None` fields keep the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub spacing: Option<f64>,
    pub burden: Option<f64>,
    pub depth: Option<f64>,
    pub diameter: Option<f64>,
    pub stemming: Option<f64>,
    pub sub_drill: Option<f64>,
}

impl SettingsPatch {
    /// Apply this patch on top of `settings`.
    pub fn apply(&self, settings: &PatternSettings) -> PatternSettings {
        PatternSettings {
            spacing: self.spacing.unwrap_or(settings.spacing),
            burden: self.burden.unwrap_or(settings.burden),
            depth: self.depth.unwrap_or(settings.depth),
            diameter: self.diameter.or(settings.diameter),
            stemming: self.stemming.or(settings.stemming),
            sub_drill: self.sub_drill.or(settings.sub_drill),
        }
    }
}

/// Export payload handed to the blast-sequence designer.
///
/// Always built from deep copies, so mutating an export never reaches the
/// live pattern state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternData {
    pub drill_points: Vec<DrillPoint>,
    pub settings: PatternSettings,
}
