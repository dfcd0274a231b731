//! Drill point creation, lattice generation and placement checks.
//!
//! Identifiers come from a monotonically increasing counter (`DH1`, `DH2`,
//! ...). The counter is shared by every clone of a factory, and
//! [`DrillPointFactory::global`] gives the process-wide instance used by an
//! editing session. After a pattern is loaded the counter must be reconciled
//! with [`DrillPointFactory::reconcile_numbering`] before new points are
//! created, otherwise fresh ids can collide with loaded ones.

use crate::coordinates::snap_to_grid;
use blastgrid_core::{round2, DrillPoint, PatternSettings, DRILL_ID_PREFIX};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Why a point cannot be placed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementError {
    #[error("Invalid coordinates ({x}, {y})")]
    InvalidCoordinates { x: f64, y: f64 },

    #[error("A drill point already exists at coordinates ({x:.2}, {y:.2})")]
    Duplicate { x: f64, y: f64 },

    #[error("Maximum number of drill points ({max}) reached")]
    LimitReached { max: usize },

    #[error("Pattern is read-only")]
    ReadOnly,
}

/// Parameters of a rectangular lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPatternSpec {
    pub rows: usize,
    pub cols: usize,
    pub spacing: f64,
    pub burden: f64,
    pub depth: f64,
    pub start_x: f64,
    pub start_y: f64,
    /// Start the lattice at `(spacing, burden)` instead of `(start_x, start_y)`
    pub start_at_spacing_burden: bool,
}

impl GridPatternSpec {
    /// A lattice using the pattern's spacing, burden and depth, starting one
    /// pitch away from the origin.
    pub fn from_settings(rows: usize, cols: usize, settings: &PatternSettings) -> Self {
        Self {
            rows,
            cols,
            spacing: settings.spacing,
            burden: settings.burden,
            depth: settings.depth,
            start_x: 0.0,
            start_y: 0.0,
            start_at_spacing_burden: true,
        }
    }
}

/// Creates drill points and hands out their identifiers.
#[derive(Debug, Clone)]
pub struct DrillPointFactory {
    next_id: Arc<AtomicU64>,
}

impl Default for DrillPointFactory {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_FACTORY: OnceLock<DrillPointFactory> = OnceLock::new();

impl DrillPointFactory {
    /// A factory with its own counter, starting at 1.
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The process-wide factory.
    pub fn global() -> &'static DrillPointFactory {
        GLOBAL_FACTORY.get_or_init(DrillPointFactory::new)
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}{}", DRILL_ID_PREFIX, n)
    }

    /// Create a drill point at grid position `(x, y)`.
    ///
    /// In precise mode the position is snapped to multiples of spacing and
    /// burden first. Coordinates are rounded to 2 decimals.
    pub fn create_drill_point(
        &self,
        x: f64,
        y: f64,
        settings: &PatternSettings,
        is_precise_mode: bool,
    ) -> DrillPoint {
        let (x, y) = if is_precise_mode {
            snap_to_grid(x, y, settings.spacing, settings.burden)
        } else {
            (x, y)
        };

        DrillPoint::new(
            self.allocate_id(),
            round2(x),
            round2(y),
            settings.depth,
            settings.spacing,
            settings.burden,
        )
        .with_charge(settings.stemming, settings.sub_drill)
    }

    /// Generate a row-major rectangular lattice of fresh points.
    pub fn generate_grid_pattern(&self, spec: &GridPatternSpec) -> Vec<DrillPoint> {
        let (origin_x, origin_y) = if spec.start_at_spacing_burden {
            (spec.spacing, spec.burden)
        } else {
            (spec.start_x, spec.start_y)
        };

        let mut points = Vec::with_capacity(spec.rows * spec.cols);
        for row in 0..spec.rows {
            for col in 0..spec.cols {
                let x = origin_x + col as f64 * spec.spacing;
                let y = origin_y + row as f64 * spec.burden;
                points.push(DrillPoint::new(
                    self.allocate_id(),
                    round2(x),
                    round2(y),
                    spec.depth,
                    spec.spacing,
                    spec.burden,
                ));
            }
        }

        tracing::debug!(
            "Generated {}x{} lattice ({} points)",
            spec.rows,
            spec.cols,
            points.len()
        );
        points
    }

    /// Re-snap points to their own spacing/burden lattice.
    pub fn align_existing_points_to_grid(points: &[DrillPoint]) -> Vec<DrillPoint> {
        points
            .iter()
            .map(|point| {
                let (x, y) = snap_to_grid(point.x, point.y, point.spacing, point.burden);
                DrillPoint {
                    x: round2(x),
                    y: round2(y),
                    ..point.clone()
                }
            })
            .collect()
    }

    /// Restart numbering at `DH1`.
    pub fn reset_numbering(&self) {
        self.next_id.store(1, Ordering::SeqCst);
    }

    /// Number the next created point will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    pub fn set_next_id(&self, next: u64) {
        self.next_id.store(next.max(1), Ordering::SeqCst);
    }

    /// Move the counter past every `DH{n}` id in `points`.
    ///
    /// Returns the new next number. Ids that do not follow the `DH{n}` layout
    /// are ignored.
    pub fn reconcile_numbering(&self, points: &[DrillPoint]) -> u64 {
        let next = points
            .iter()
            .filter_map(DrillPoint::numeric_suffix)
            .max()
            .map_or(1, |max| max + 1);
        self.set_next_id(next);
        tracing::debug!("Drill point numbering reconciled to {}", next);
        next
    }
}

/// Whether `point` deviates from the global depth beyond tolerance.
pub fn has_custom_depth(point: &DrillPoint, global_depth: f64) -> bool {
    point.has_custom_depth(global_depth)
}

/// Points whose depth deviates from the global depth.
pub fn get_points_with_custom_depths(points: &[DrillPoint], global_depth: f64) -> Vec<DrillPoint> {
    points
        .iter()
        .filter(|p| has_custom_depth(p, global_depth))
        .cloned()
        .collect()
}

pub fn validate_coordinates(x: f64, y: f64) -> Result<(), PlacementError> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(PlacementError::InvalidCoordinates { x, y })
    }
}

pub fn validate_unique_coordinates(
    x: f64,
    y: f64,
    points: &[DrillPoint],
) -> Result<(), PlacementError> {
    if points.iter().any(|p| p.is_at(x, y)) {
        Err(PlacementError::Duplicate { x, y })
    } else {
        Ok(())
    }
}

/// Whether one more point fits under `max`.
pub fn validate_point_count(count: usize, max: usize) -> Result<(), PlacementError> {
    if count >= max {
        Err(PlacementError::LimitReached { max })
    } else {
        Ok(())
    }
}

/// All placement checks, in the order a pointer click applies them.
pub fn check_placement(
    x: f64,
    y: f64,
    points: &[DrillPoint],
    max: usize,
) -> Result<(), PlacementError> {
    validate_point_count(points.len(), max)?;
    validate_coordinates(x, y)?;
    validate_unique_coordinates(x, y, points)
}

/// Euclidean distance between two points, in grid units.
pub fn distance(a: &DrillPoint, b: &DrillPoint) -> f64 {
    a.distance_to(b)
}

/// Closest point to `(x, y)` within `radius` grid units.
pub fn nearest_point(points: &[DrillPoint], x: f64, y: f64, radius: f64) -> Option<&DrillPoint> {
    points
        .iter()
        .map(|p| (p, (p.x - x).hypot(p.y - y)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(p, _)| p)
}
