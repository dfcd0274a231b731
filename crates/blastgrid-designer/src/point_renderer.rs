//! Drill point visuals
//!
//! Each point is a group positioned at its canvas location holding a marker
//! circle and an id label. Marker colours follow a fixed priority: selection
//! first, then custom depth, then the default. Points with a custom depth
//! also carry a small diamond. Hovering a point shows a tooltip and a
//! highlight ring; both are removed again when the pointer leaves.

use crate::coordinates::{CanvasGeometry, ViewTransform};
use crate::drill_points::has_custom_depth;
use crate::surface::{DrawingSurface, GroupAttrs, NodeId, Primitive, Shape, Style};
use blastgrid_core::{DrillPoint, PatternState, Result};

pub const POINT_GROUP_NAME: &str = "drill-point-group";
pub const TOOLTIP_NAME: &str = "tooltip";
pub const HIGHLIGHT_NAME: &str = "point-highlight";

const LABEL_FONT_SIZE: f64 = 12.0;
const LABEL_COLOR: &str = "#000000";

const DIAMOND_RADIUS: f64 = 4.0;
const DIAMOND_FILL: &str = "#ff5722";
const DIAMOND_STROKE: &str = "#ffffff";

const HIGHLIGHT_STROKE: &str = "#ffeb3b";

const TOOLTIP_FONT_SIZE: f64 = 12.0;
const TOOLTIP_LINE_HEIGHT: f64 = 16.0;
const TOOLTIP_PADDING: f64 = 6.0;
const TOOLTIP_CHAR_WIDTH: f64 = 7.0;
const TOOLTIP_BACKGROUND: &str = "rgba(0, 0, 0, 0.8)";
const TOOLTIP_TEXT: &str = "#ffffff";

/// Marker fill and stroke
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointColors {
    pub fill: &'static str,
    pub stroke: &'static str,
    pub stroke_width: f64,
}

pub const SELECTED_COLORS: PointColors = PointColors {
    fill: "#ff4444",
    stroke: "#ffff00",
    stroke_width: 3.0,
};

pub const CUSTOM_DEPTH_COLORS: PointColors = PointColors {
    fill: "#ff9800",
    stroke: "#e65100",
    stroke_width: 2.0,
};

pub const DEFAULT_COLORS: PointColors = PointColors {
    fill: "#2196f3",
    stroke: "#ffffff",
    stroke_width: 2.0,
};

/// Pick marker colours; selection wins over custom depth.
pub fn point_colors(is_selected: bool, is_custom_depth: bool) -> PointColors {
    if is_selected {
        SELECTED_COLORS
    } else if is_custom_depth {
        CUSTOM_DEPTH_COLORS
    } else {
        DEFAULT_COLORS
    }
}

/// Handle to a drawn point
#[derive(Debug, Clone, PartialEq)]
pub struct PointVisual {
    pub point_id: String,
    pub node: NodeId,
    pub custom_depth: bool,
}

#[derive(Debug, Clone, Copy)]
struct HoverState {
    visual: NodeId,
    tooltip: NodeId,
}

/// Draws drill points and manages hover decorations.
#[derive(Debug)]
pub struct DrillPointRenderer {
    geometry: CanvasGeometry,
    hover: Option<HoverState>,
}

impl DrillPointRenderer {
    pub fn new(geometry: CanvasGeometry) -> Self {
        Self {
            geometry,
            hover: None,
        }
    }

    pub fn geometry(&self) -> &CanvasGeometry {
        &self.geometry
    }

    /// Create the visual for one point under `parent`.
    ///
    /// The group is draggable only outside hole placement mode.
    #[allow(clippy::too_many_arguments)]
    pub fn create_drill_point_visual<S: DrawingSurface>(
        &self,
        surface: &mut S,
        parent: NodeId,
        point: &DrillPoint,
        view: &ViewTransform,
        is_hole_placement_mode: bool,
        is_selected: bool,
        global_depth: Option<f64>,
    ) -> Result<PointVisual> {
        let (x, y) = self.geometry.to_canvas(point.x, point.y, view);
        let custom_depth = global_depth.is_some_and(|depth| has_custom_depth(point, depth));
        let colors = point_colors(is_selected, custom_depth);
        let r = self.geometry.point_radius;

        let group = surface.create_group(
            parent,
            GroupAttrs::named(POINT_GROUP_NAME)
                .at(x, y)
                .draggable(!is_hole_placement_mode),
        )?;

        surface.add(
            group,
            Primitive::new(
                Shape::circle(0.0, 0.0, r),
                Style::fill(colors.fill).with_stroke(colors.stroke, colors.stroke_width),
            )
            .named("marker"),
        )?;
        surface.add(
            group,
            Primitive::new(
                Shape::text(-r, -r, point.id.clone(), LABEL_FONT_SIZE),
                Style::fill(LABEL_COLOR),
            )
            .named("label"),
        )?;

        if custom_depth {
            surface.add(
                group,
                Primitive::new(
                    Shape::polygon(r + 3.0, -r - 3.0, 4, DIAMOND_RADIUS),
                    Style::fill(DIAMOND_FILL).with_stroke(DIAMOND_STROKE, 1.0),
                )
                .named("depth-indicator"),
            )?;
        }

        Ok(PointVisual {
            point_id: point.id.clone(),
            node: group,
            custom_depth,
        })
    }

    /// Draw every point of `state` under `parent`, replacing its children.
    pub fn render_points<S: DrawingSurface>(
        &mut self,
        surface: &mut S,
        parent: NodeId,
        state: &PatternState,
        view: &ViewTransform,
    ) -> Result<Vec<PointVisual>> {
        surface.destroy_children(parent)?;
        self.hover = None;

        let selected = state.selected_point.as_ref().map(|p| p.id.as_str());
        let visuals = state
            .drill_points
            .iter()
            .map(|point| {
                self.create_drill_point_visual(
                    surface,
                    parent,
                    point,
                    view,
                    state.ui.is_hole_placement_mode,
                    selected == Some(point.id.as_str()),
                    Some(state.settings.depth),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        surface.batch_draw();
        tracing::debug!("Rendered {} drill points", visuals.len());
        Ok(visuals)
    }

    /// Attach the tooltip and highlight ring to a hovered point.
    ///
    /// A tooltip still attached to another point is removed first.
    pub fn on_hover_enter<S: DrawingSurface>(
        &mut self,
        surface: &mut S,
        visual: &PointVisual,
        point: &DrillPoint,
        global_depth: Option<f64>,
    ) -> Result<NodeId> {
        self.on_hover_leave(surface)?;

        let r = self.geometry.point_radius;
        surface.add(
            visual.node,
            Primitive::new(
                Shape::circle(0.0, 0.0, r + 3.0),
                Style::stroke(HIGHLIGHT_STROKE, 2.0),
            )
            .named(HIGHLIGHT_NAME),
        )?;

        let lines = tooltip_lines(point, global_depth);
        let width = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0) as f64
            * TOOLTIP_CHAR_WIDTH
            + TOOLTIP_PADDING * 2.0;
        let height = lines.len() as f64 * TOOLTIP_LINE_HEIGHT + TOOLTIP_PADDING * 2.0;

        let tooltip = surface.create_group(
            visual.node,
            GroupAttrs::named(TOOLTIP_NAME).at(r + 10.0, -r - 10.0 - height),
        )?;
        surface.add(
            tooltip,
            Primitive::new(
                Shape::rect(0.0, 0.0, width, height),
                Style::fill(TOOLTIP_BACKGROUND),
            ),
        )?;
        for (i, line) in lines.into_iter().enumerate() {
            surface.add(
                tooltip,
                Primitive::new(
                    Shape::text(
                        TOOLTIP_PADDING,
                        TOOLTIP_PADDING + i as f64 * TOOLTIP_LINE_HEIGHT,
                        line,
                        TOOLTIP_FONT_SIZE,
                    ),
                    Style::fill(TOOLTIP_TEXT),
                ),
            )?;
        }
        surface.batch_draw();

        self.hover = Some(HoverState {
            visual: visual.node,
            tooltip,
        });
        Ok(tooltip)
    }

    /// Remove the tooltip and highlight ring, if any.
    pub fn on_hover_leave<S: DrawingSurface>(&mut self, surface: &mut S) -> Result<()> {
        if let Some(hover) = self.hover.take() {
            if surface.contains(hover.tooltip) {
                surface.destroy(hover.tooltip)?;
            }
            if surface.contains(hover.visual) {
                surface.destroy_named(hover.visual, HIGHLIGHT_NAME)?;
            }
            surface.batch_draw();
        }
        Ok(())
    }

    /// Tooltip currently shown.
    pub fn active_tooltip(&self) -> Option<NodeId> {
        self.hover.map(|hover| hover.tooltip)
    }

    /// Make existing visuals draggable again, or not, after a mode switch.
    pub fn update_point_selectability<S: DrawingSurface>(
        &self,
        surface: &mut S,
        visuals: &[PointVisual],
        is_hole_placement_mode: bool,
    ) -> Result<()> {
        for visual in visuals {
            surface.set_draggable(visual.node, !is_hole_placement_mode)?;
        }
        surface.batch_draw();
        Ok(())
    }
}

fn tooltip_lines(point: &DrillPoint, global_depth: Option<f64>) -> Vec<String> {
    let mut lines = vec![
        point.id.clone(),
        format!("X: {:.2} Y: {:.2}", point.x, point.y),
        format!("Depth: {:.1}m", point.depth),
    ];
    if let Some(global) = global_depth.filter(|g| has_custom_depth(point, *g)) {
        lines.push(format!("Global: {:.1}m", global));
    }
    lines
}
