//! Grid-space and canvas-space coordinate conversion.
//!
//! Grid space is measured in meters and independent of zoom and pan. Canvas
//! space is in pixels on the drawing surface, after scale, pan offset and
//! the ruler band along the top and left edges.
//!
//! ```text
//! canvas = grid * cell_size * scale + offset + ruler
//! grid   = (canvas - ruler - offset) / (cell_size * scale)
//! ```

use blastgrid_core::{GridPosition, PatternSettings};
use blastgrid_settings::CanvasSettings;

/// Map a single grid coordinate to canvas pixels.
pub fn grid_to_canvas(grid_coord: f64, cell_size: f64, scale: f64, offset: f64, ruler_size: f64) -> f64 {
    grid_coord * cell_size * scale + offset + ruler_size
}

/// Map a single canvas coordinate back to grid units.
pub fn canvas_to_grid(canvas_coord: f64, cell_size: f64, scale: f64, offset: f64, ruler_size: f64) -> f64 {
    (canvas_coord - ruler_size - offset) / (cell_size * scale)
}

/// Snap `value` to the nearest multiple of `step`.
///
/// Non-positive or non-finite steps leave the value unchanged.
pub fn snap(value: f64, step: f64) -> f64 {
    if step > 0.0 && step.is_finite() {
        (value / step).round() * step
    } else {
        value
    }
}

/// Snap a grid position to the spacing/burden lattice.
pub fn snap_to_grid(x: f64, y: f64, spacing: f64, burden: f64) -> (f64, f64) {
    (snap(x, spacing), snap(y, burden))
}

/// Fixed canvas geometry shared by the renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    /// Pixels per grid unit at scale 1.0
    pub grid_size: f64,
    pub ruler_width: f64,
    pub ruler_height: f64,
    pub point_radius: f64,
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        Self::from(&CanvasSettings::default())
    }
}

impl From<&CanvasSettings> for CanvasGeometry {
    fn from(settings: &CanvasSettings) -> Self {
        Self {
            grid_size: settings.grid_size,
            ruler_width: settings.ruler_width,
            ruler_height: settings.ruler_height,
            point_radius: settings.point_radius,
        }
    }
}

/// Current zoom and pan of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl ViewTransform {
    pub fn new(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Pan by a pixel delta.
    pub fn pan_by(&self, dx: f64, dy: f64) -> Self {
        Self {
            offset_x: self.offset_x + dx,
            offset_y: self.offset_y + dy,
            ..*self
        }
    }
}

impl CanvasGeometry {
    /// Grid position to canvas pixels.
    pub fn to_canvas(&self, x: f64, y: f64, view: &ViewTransform) -> (f64, f64) {
        (
            grid_to_canvas(x, self.grid_size, view.scale, view.offset_x, self.ruler_width),
            grid_to_canvas(y, self.grid_size, view.scale, view.offset_y, self.ruler_height),
        )
    }

    /// Canvas pixels to grid position, without snapping.
    pub fn to_grid(&self, canvas_x: f64, canvas_y: f64, view: &ViewTransform) -> (f64, f64) {
        (
            canvas_to_grid(canvas_x, self.grid_size, view.scale, view.offset_x, self.ruler_width),
            canvas_to_grid(canvas_y, self.grid_size, view.scale, view.offset_y, self.ruler_height),
        )
    }

    /// Zoom by `factor` about a fixed canvas point, clamped to `[min, max]`.
    ///
    /// The grid position under `(anchor_x, anchor_y)` stays under it.
    pub fn zoom_about(
        &self,
        view: &ViewTransform,
        factor: f64,
        anchor_x: f64,
        anchor_y: f64,
        min: f64,
        max: f64,
    ) -> ViewTransform {
        let scale = (view.scale * factor).clamp(min, max);
        let ratio = scale / view.scale;
        let local_x = anchor_x - self.ruler_width;
        let local_y = anchor_y - self.ruler_height;
        ViewTransform {
            scale,
            offset_x: local_x - (local_x - view.offset_x) * ratio,
            offset_y: local_y - (local_y - view.offset_y) * ratio,
        }
    }

    /// Grid position under a pointer, snapped to the lattice in precise mode.
    ///
    /// Snapping needs the pattern settings; without them the raw position is
    /// returned even in precise mode.
    pub fn calculate_grid_coordinates(
        &self,
        pointer_x: f64,
        pointer_y: f64,
        view: &ViewTransform,
        is_precise_mode: bool,
        settings: Option<&PatternSettings>,
    ) -> GridPosition {
        let (x, y) = self.to_grid(pointer_x, pointer_y, view);
        match settings {
            Some(settings) if is_precise_mode => {
                let (x, y) = snap_to_grid(x, y, settings.spacing, settings.burden);
                GridPosition::new(x, y)
            }
            _ => GridPosition::new(x, y),
        }
    }
}
