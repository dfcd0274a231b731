//! Pattern validation
//!
//! `validate` is a pure function over a `PatternState` snapshot. Errors make a
//! pattern unsaveable; warnings are informational and never affect validity.

use crate::data::{DrillPoint, PatternState, COORDINATE_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Maximum number of drill points in one pattern.
pub const MAX_DRILL_POINTS: usize = 500;

/// Maximum hole depth in meters.
pub const MAX_DEPTH: f64 = 50.0;

/// Spacing or burden above this value triggers a warning.
pub const LARGE_PITCH_THRESHOLD: f64 = 10.0;

/// Machine-readable code of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    EmptyPattern,
    TooManyPoints,
    InvalidSpacing,
    InvalidBurden,
    InvalidDepth,
    DuplicatePoints,
    DuplicateIds,
    LargeSpacing,
    LargeBurden,
    CustomDepths,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::EmptyPattern => "EMPTY_PATTERN",
            ValidationCode::TooManyPoints => "TOO_MANY_POINTS",
            ValidationCode::InvalidSpacing => "INVALID_SPACING",
            ValidationCode::InvalidBurden => "INVALID_BURDEN",
            ValidationCode::InvalidDepth => "INVALID_DEPTH",
            ValidationCode::DuplicatePoints => "DUPLICATE_POINTS",
            ValidationCode::DuplicateIds => "DUPLICATE_IDS",
            ValidationCode::LargeSpacing => "LARGE_SPACING",
            ValidationCode::LargeBurden => "LARGE_BURDEN",
            ValidationCode::CustomDepths => "CUSTOM_DEPTHS",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation error or warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub code: ValidationCode,
}

impl ValidationIssue {
    fn new(field: &str, message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            code,
        }
    }
}

/// Structured result of validating a pattern.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Messages of all errors, in report order.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }

    pub fn has_error(&self, code: ValidationCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn has_warning(&self, code: ValidationCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}

/// Validate a pattern snapshot.
pub fn validate(state: &PatternState) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let points = &state.drill_points;
    let settings = &state.settings;

    if points.is_empty() {
        errors.push(ValidationIssue::new(
            "drillPoints",
            "At least one drill point is required",
            ValidationCode::EmptyPattern,
        ));
    }

    if points.len() > MAX_DRILL_POINTS {
        errors.push(ValidationIssue::new(
            "drillPoints",
            format!("Maximum {} drill points allowed", MAX_DRILL_POINTS),
            ValidationCode::TooManyPoints,
        ));
    }

    // Written as negated comparisons so NaN is rejected.
    if !(settings.spacing > 0.0) {
        errors.push(ValidationIssue::new(
            "spacing",
            "Spacing must be greater than 0",
            ValidationCode::InvalidSpacing,
        ));
    }

    if !(settings.burden > 0.0) {
        errors.push(ValidationIssue::new(
            "burden",
            "Burden must be greater than 0",
            ValidationCode::InvalidBurden,
        ));
    }

    if !(settings.depth > 0.0 && settings.depth <= MAX_DEPTH) {
        errors.push(ValidationIssue::new(
            "depth",
            format!("Depth must be between 0 and {} meters", MAX_DEPTH),
            ValidationCode::InvalidDepth,
        ));
    }

    let duplicates = find_duplicate_positions(points);
    if !duplicates.is_empty() {
        let coords = duplicates
            .iter()
            .map(|p| format!("({}, {})", p.x, p.y))
            .collect::<Vec<_>>()
            .join(", ");
        errors.push(ValidationIssue::new(
            "drillPoints",
            format!("Duplicate drill points found at coordinates: {}", coords),
            ValidationCode::DuplicatePoints,
        ));
    }

    let duplicate_ids = find_duplicate_ids(points);
    if !duplicate_ids.is_empty() {
        errors.push(ValidationIssue::new(
            "drillPoints",
            format!("Duplicate drill point IDs found: {}", duplicate_ids.join(", ")),
            ValidationCode::DuplicateIds,
        ));
    }

    if settings.spacing > LARGE_PITCH_THRESHOLD {
        warnings.push(ValidationIssue::new(
            "spacing",
            "Large spacing value may not be typical for drilling patterns",
            ValidationCode::LargeSpacing,
        ));
    }

    if settings.burden > LARGE_PITCH_THRESHOLD {
        warnings.push(ValidationIssue::new(
            "burden",
            "Large burden value may not be typical for drilling patterns",
            ValidationCode::LargeBurden,
        ));
    }

    let custom = points
        .iter()
        .filter(|p| p.has_custom_depth(settings.depth))
        .count();
    if custom > 0 {
        warnings.push(ValidationIssue::new(
            "drillPoints",
            format!("{} drill points have custom depths", custom),
            ValidationCode::CustomDepths,
        ));
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Points that share a position (within tolerance) with an earlier point.
///
/// Sorting by x lets the sweep stop as soon as the x gap exceeds tolerance.
pub fn find_duplicate_positions(points: &[DrillPoint]) -> Vec<&DrillPoint> {
    let mut order: Vec<&DrillPoint> = points.iter().collect();
    order.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut flagged = vec![false; order.len()];
    for i in 0..order.len() {
        for j in (i + 1)..order.len() {
            if order[j].x - order[i].x >= COORDINATE_TOLERANCE {
                break;
            }
            if (order[j].y - order[i].y).abs() < COORDINATE_TOLERANCE {
                flagged[j] = true;
            }
        }
    }

    order
        .into_iter()
        .zip(flagged)
        .filter_map(|(p, dup)| dup.then_some(p))
        .collect()
}

/// Ids used by more than one point, in first-seen order.
pub fn find_duplicate_ids(points: &[DrillPoint]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    for point in points {
        let count = counts.entry(point.id.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            duplicates.push(point.id.clone());
        }
    }
    duplicates
}
