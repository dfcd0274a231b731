//! Grid rendering engine
//!
//! Draws the spacing/burden lattice behind the drill points: minor lines at
//! half pitch, major lines at full pitch and, in precise mode, a marker on
//! every major intersection. Output is bounded by the configured primitive
//! budgets, so a pathological zoom never produces an unbounded frame.
//!
//! Rendered primitive sets are cached by a key built from every parameter
//! that affects the output. A cache hit re-adds the cached copies without
//! recomputing anything.

use crate::color::with_opacity;
use crate::coordinates::{CanvasGeometry, ViewTransform};
use crate::surface::{
    DrawingSurface, GroupAttrs, NodeId, Primitive, Shape, SharedSurface, StageInfo, Style,
};
use blastgrid_core::{
    AppEvent, EventBus, GridPosition, PatternError, PrimitiveKind, RenderEvent, Result,
};
use blastgrid_settings::{Config, RenderSettings};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MINOR_OPACITY: f64 = 0.3;
const MAJOR_OPACITY: f64 = 0.6;
const MINOR_WIDTH: f64 = 0.5;
const MAJOR_WIDTH: f64 = 1.0;

const INTERSECTION_RADIUS: f64 = 2.0;
const INTERSECTION_FILL: &str = "rgba(255, 165, 0, 0.8)";
const INTERSECTION_STROKE: &str = "rgba(255, 140, 0, 1)";

const HIGHLIGHT_NAME: &str = "highlight";
const HIGHLIGHT_RADIUS: f64 = 4.0;
const HIGHLIGHT_FILL: &str = "rgba(255, 193, 7, 0.8)";
const HIGHLIGHT_STROKE: &str = "rgba(255, 152, 0, 1)";

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    /// No surface bound yet
    Uninitialized,
    Ready,
    /// Terminal
    Destroyed,
}

/// Inputs of a grid computation, in canvas pixels unless noted.
#[derive(Debug, Clone, PartialEq)]
pub struct GridParams {
    /// Grid units
    pub spacing: f64,
    /// Grid units
    pub burden: f64,
    pub cell_size: f64,
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: f64,
    pub height: f64,
    pub ruler_width: f64,
    pub ruler_height: f64,
    pub color: String,
    pub precise: bool,
    pub max_lines: usize,
    pub max_intersections: usize,
}

/// Output of [`compute_grid`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridPrimitives {
    pub lines: Vec<Primitive>,
    pub intersections: Vec<Primitive>,
    pub lines_truncated: bool,
    pub intersections_truncated: bool,
}

impl GridPrimitives {
    pub fn len(&self) -> usize {
        self.lines.len() + self.intersections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// First line position at or after `start` for a lattice shifted by `offset`.
fn aligned_start(start: f64, offset: f64, pitch: f64) -> f64 {
    let aligned = start + offset % pitch;
    if aligned < start {
        aligned + pitch
    } else {
        aligned
    }
}

/// Positions from `first` to `end` inclusive, in steps of `step`, skipping
/// those before `start`.
fn positions(first: f64, start: f64, end: f64, step: f64) -> impl Iterator<Item = f64> {
    (0u64..)
        .map(move |i| first + i as f64 * step)
        .take_while(move |p| *p <= end)
        .filter(move |p| *p >= start)
}

/// Compute grid primitives for one frame.
pub fn compute_grid(params: &GridParams) -> GridPrimitives {
    let mut out = GridPrimitives::default();

    let pitch_x = params.spacing * params.cell_size * params.scale;
    let pitch_y = params.burden * params.cell_size * params.scale;
    if !(pitch_x > 0.0 && pitch_x.is_finite() && pitch_y > 0.0 && pitch_y.is_finite()) {
        return out;
    }

    let (left, top) = (params.ruler_width, params.ruler_height);
    let (right, bottom) = (params.width, params.height);
    let x0 = aligned_start(left, params.offset_x, pitch_x);
    let y0 = aligned_start(top, params.offset_y, pitch_y);

    let minor = Style::stroke(with_opacity(&params.color, MINOR_OPACITY), MINOR_WIDTH);
    let major = Style::stroke(with_opacity(&params.color, MAJOR_OPACITY), MAJOR_WIDTH);

    let vertical = |x: f64| Shape::line(x, top, x, bottom);
    let horizontal = |y: f64| Shape::line(left, y, right, y);

    let minor_lines = positions(x0 - pitch_x, left, right, pitch_x / 2.0)
        .map(vertical)
        .chain(positions(y0 - pitch_y, top, bottom, pitch_y / 2.0).map(horizontal))
        .map(|shape| (shape, &minor));
    let major_lines = positions(x0, left, right, pitch_x)
        .map(vertical)
        .chain(positions(y0, top, bottom, pitch_y).map(horizontal))
        .map(|shape| (shape, &major));

    // Pull at most one line past the budget so a tiny pitch never
    // enumerates the full lattice.
    for (shape, style) in minor_lines.chain(major_lines).take(params.max_lines + 1) {
        if out.lines.len() >= params.max_lines {
            out.lines_truncated = true;
            break;
        }
        out.lines.push(Primitive::new(shape, style.clone()));
    }

    if params.precise {
        let marker = Style::fill(INTERSECTION_FILL).with_stroke(INTERSECTION_STROKE, 1.0);
        'markers: for x in positions(x0, left, right, pitch_x) {
            for y in positions(y0, top, bottom, pitch_y) {
                if out.intersections.len() >= params.max_intersections {
                    out.intersections_truncated = true;
                    break 'markers;
                }
                out.intersections.push(Primitive::new(
                    Shape::circle(x, y, INTERSECTION_RADIUS),
                    marker.clone(),
                ));
            }
        }
    }

    out
}

#[derive(Debug, Clone)]
struct CachedGrid {
    lines: Vec<Primitive>,
    intersections: Vec<Primitive>,
}

/// Bounded render cache, evicted in insertion order
#[derive(Debug)]
struct RenderCache {
    entries: HashMap<String, CachedGrid>,
    order: VecDeque<String>,
    capacity: usize,
}

impl RenderCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, key: &str) -> Option<&CachedGrid> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: String, grid: CachedGrid) {
        if self.entries.insert(key.clone(), grid).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!("Evicted grid render {}", oldest);
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Render performance counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub render_count: u64,
    pub cache_hits: u64,
    pub last_render_time: Duration,
    pub cache_size: usize,
}

impl RenderStats {
    /// Share of renders served from the cache, `0.0` before the first render.
    pub fn hit_rate(&self) -> f64 {
        if self.render_count == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.render_count as f64
        }
    }
}

/// Result of a single render call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Grid primitives on the surface after the render
    pub primitives: usize,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Copy)]
struct GridLayers {
    layer: NodeId,
    lines: NodeId,
    intersections: NodeId,
}

/// Draws the grid onto a [`DrawingSurface`].
pub struct GridRenderingEngine<S: DrawingSurface> {
    phase: RenderPhase,
    surface: Option<SharedSurface<S>>,
    layers: Option<GridLayers>,
    geometry: CanvasGeometry,
    limits: RenderSettings,
    view: ViewTransform,
    spacing: f64,
    burden: f64,
    color: String,
    visible: bool,
    caching: bool,
    precise: bool,
    cache: RenderCache,
    render_count: u64,
    cache_hits: u64,
    last_render_time: Duration,
    events: Option<Arc<EventBus>>,
}

impl<S: DrawingSurface> GridRenderingEngine<S> {
    pub fn new(geometry: CanvasGeometry, limits: RenderSettings, color: impl Into<String>) -> Self {
        Self {
            phase: RenderPhase::Uninitialized,
            surface: None,
            layers: None,
            geometry,
            caching: limits.caching_enabled,
            cache: RenderCache::new(limits.max_cache_size),
            limits,
            view: ViewTransform::default(),
            spacing: 1.0,
            burden: 1.0,
            color: color.into(),
            visible: true,
            precise: false,
            render_count: 0,
            cache_hits: 0,
            last_render_time: Duration::ZERO,
            events: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CanvasGeometry::from(&config.canvas),
            config.render.clone(),
            config.canvas.grid_color.clone(),
        )
    }

    /// Publish render events on `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// Bind the engine to a surface.
    ///
    /// Fails with a configuration error when the surface has no stage or the
    /// engine was destroyed. Re-initializing moves the grid to the new surface.
    pub fn initialize(&mut self, surface: SharedSurface<S>) -> Result<()> {
        if self.phase == RenderPhase::Destroyed {
            return Err(PatternError::configuration(
                "Grid renderer was destroyed and cannot be reinitialized",
            ));
        }

        let layers = {
            let mut guard = surface.lock();
            let stage = guard.stage().ok_or_else(|| {
                PatternError::configuration("Drawing surface is not attached to a stage")
            })?;
            let root = guard.root();
            let layer = guard.create_group(root, GroupAttrs::named("grid-layer"))?;
            let lines = guard.create_group(layer, GroupAttrs::named("grid-lines"))?;
            let intersections =
                guard.create_group(layer, GroupAttrs::named("grid-intersections"))?;
            guard.set_visible(intersections, self.precise)?;
            guard.set_visible(layer, self.visible)?;
            tracing::info!(
                "Grid renderer initialized on {}x{} stage",
                stage.width,
                stage.height
            );
            GridLayers {
                layer,
                lines,
                intersections,
            }
        };

        self.release_layers();
        self.surface = Some(surface);
        self.layers = Some(layers);
        self.cache.clear();
        self.phase = RenderPhase::Ready;
        Ok(())
    }

    fn ready(&self) -> Result<(SharedSurface<S>, GridLayers)> {
        match (self.phase, &self.surface, self.layers) {
            (RenderPhase::Ready, Some(surface), Some(layers)) => Ok((surface.clone(), layers)),
            (RenderPhase::Destroyed, _, _) => {
                Err(PatternError::configuration("Grid renderer has been destroyed"))
            }
            _ => Err(PatternError::configuration(
                "Grid renderer used before initialize()",
            )),
        }
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    /// Update zoom and pan. The next render picks a new cache key.
    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = view;
    }

    pub fn grid_spacing(&self) -> (f64, f64) {
        (self.spacing, self.burden)
    }

    /// Use the same pitch on both axes.
    pub fn set_grid_spacing(&mut self, spacing: f64) -> Result<()> {
        self.set_grid_pitch(spacing, spacing)
    }

    /// Set spacing (x) and burden (y) pitch in grid units.
    pub fn set_grid_pitch(&mut self, spacing: f64, burden: f64) -> Result<()> {
        if !(spacing > 0.0 && spacing.is_finite()) {
            return Err(PatternError::invalid_argument(
                "spacing",
                format!("must be greater than 0, got {}", spacing),
            ));
        }
        if !(burden > 0.0 && burden.is_finite()) {
            return Err(PatternError::invalid_argument(
                "burden",
                format!("must be greater than 0, got {}", burden),
            ));
        }
        self.spacing = spacing;
        self.burden = burden;
        self.invalidate_cache();
        Ok(())
    }

    pub fn grid_color(&self) -> &str {
        &self.color
    }

    pub fn set_grid_color(&mut self, color: &str) -> Result<()> {
        if color.trim().is_empty() {
            return Err(PatternError::invalid_argument(
                "color",
                "must be a non-empty colour string",
            ));
        }
        self.color = color.to_string();
        self.invalidate_cache();
        Ok(())
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) -> Result<()> {
        self.visible = visible;
        if let Ok((surface, layers)) = self.ready() {
            let mut guard = surface.lock();
            guard.set_visible(layers.layer, visible)?;
            guard.batch_draw();
        }
        Ok(())
    }

    pub fn is_caching_enabled(&self) -> bool {
        self.caching
    }

    /// Turn caching on or off. Turning it off drops the cache.
    pub fn enable_caching(&mut self, enabled: bool) {
        self.caching = enabled;
        if !enabled {
            self.invalidate_cache();
        }
    }

    pub fn is_precise_mode(&self) -> bool {
        self.precise
    }

    /// Show or hide intersection markers.
    pub fn show_precise_mode(&mut self, precise: bool) -> Result<()> {
        self.precise = precise;
        self.invalidate_cache();
        if let Ok((surface, layers)) = self.ready() {
            surface.lock().set_visible(layers.intersections, precise)?;
        }
        Ok(())
    }

    pub fn invalidate_cache(&mut self) {
        if self.cache.len() > 0 {
            tracing::debug!("Grid render cache invalidated ({} entries)", self.cache.len());
        }
        self.cache.clear();
        self.publish(RenderEvent::CacheInvalidated);
    }

    fn cache_key(&self, stage: &StageInfo) -> String {
        format!(
            "grid_{}_{}_{}_{:.2}_{:.0}_{:.0}_{}x{}_{}",
            self.spacing,
            self.burden,
            self.color,
            self.view.scale,
            self.view.offset_x,
            self.view.offset_y,
            stage.width,
            stage.height,
            self.precise
        )
    }

    fn params(&self, stage: &StageInfo) -> GridParams {
        GridParams {
            spacing: self.spacing,
            burden: self.burden,
            cell_size: self.geometry.grid_size,
            scale: self.view.scale,
            offset_x: self.view.offset_x,
            offset_y: self.view.offset_y,
            width: stage.width,
            height: stage.height,
            ruler_width: self.geometry.ruler_width,
            ruler_height: self.geometry.ruler_height,
            color: self.color.clone(),
            precise: self.precise,
            max_lines: self.limits.max_grid_lines,
            max_intersections: self.limits.max_intersections(),
        }
    }

    /// Draw the grid for the current view.
    pub fn render(&mut self) -> Result<RenderOutcome> {
        let (surface, layers) = self.ready()?;
        let started = Instant::now();
        let mut guard = surface.lock();

        let stage = guard
            .stage()
            .ok_or_else(|| PatternError::configuration("Drawing surface lost its stage"))?;
        let key = self.cache_key(&stage);

        let cached = if self.caching {
            self.cache.get(&key).cloned()
        } else {
            None
        };
        let cache_hit = cached.is_some();

        let grid = match cached {
            Some(grid) => {
                tracing::debug!("Grid cache hit: {}", key);
                grid
            }
            None => {
                let computed = compute_grid(&self.params(&stage));
                if computed.lines_truncated {
                    self.report_limit(PrimitiveKind::GridLines, self.limits.max_grid_lines);
                }
                if computed.intersections_truncated {
                    self.report_limit(
                        PrimitiveKind::Intersections,
                        self.limits.max_intersections(),
                    );
                }
                CachedGrid {
                    lines: computed.lines,
                    intersections: computed.intersections,
                }
            }
        };

        let primitives = grid.lines.len() + grid.intersections.len();
        Self::draw(&mut *guard, layers, &grid, self.precise).inspect_err(|e| {
            tracing::error!("Grid render failed: {}", e);
        })?;
        drop(guard);

        if cache_hit {
            self.cache_hits += 1;
        } else if self.caching {
            self.cache.insert(key, grid);
        }
        self.render_count += 1;
        self.last_render_time = started.elapsed();

        self.publish(RenderEvent::GridRendered {
            primitives,
            cache_hit,
            duration: self.last_render_time,
        });
        Ok(RenderOutcome {
            primitives,
            cache_hit,
        })
    }

    /// Same as [`render`](Self::render).
    pub fn update(&mut self) -> Result<RenderOutcome> {
        self.render()
    }

    fn draw(surface: &mut S, layers: GridLayers, grid: &CachedGrid, precise: bool) -> Result<()> {
        surface.destroy_children(layers.lines)?;
        surface.destroy_children(layers.intersections)?;
        for line in &grid.lines {
            surface.add(layers.lines, line.clone())?;
        }
        for marker in &grid.intersections {
            surface.add(layers.intersections, marker.clone())?;
        }
        surface.set_visible(layers.intersections, precise)?;
        surface.batch_draw();
        Ok(())
    }

    /// Replace intersection highlights with markers at the given grid positions.
    pub fn highlight_intersections(&mut self, points: &[GridPosition]) -> Result<usize> {
        let (surface, layers) = self.ready()?;
        let mut guard = surface.lock();
        guard.destroy_named(layers.layer, HIGHLIGHT_NAME)?;

        let style = Style::fill(HIGHLIGHT_FILL).with_stroke(HIGHLIGHT_STROKE, 2.0);
        for point in points {
            let (x, y) = self.geometry.to_canvas(point.x, point.y, &self.view);
            guard.add(
                layers.layer,
                Primitive::new(Shape::circle(x, y, HIGHLIGHT_RADIUS), style.clone())
                    .named(HIGHLIGHT_NAME),
            )?;
        }
        guard.batch_draw();
        Ok(points.len())
    }

    /// Remove all grid primitives and highlights, keeping the cache.
    pub fn clear(&mut self) -> Result<()> {
        let (surface, layers) = self.ready()?;
        let mut guard = surface.lock();
        guard.destroy_children(layers.lines)?;
        guard.destroy_children(layers.intersections)?;
        guard.destroy_named(layers.layer, HIGHLIGHT_NAME)?;
        guard.batch_draw();
        Ok(())
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            render_count: self.render_count,
            cache_hits: self.cache_hits,
            last_render_time: self.last_render_time,
            cache_size: self.cache.len(),
        }
    }

    /// Remove the grid from the surface and drop the cache. Further calls
    /// fail with a configuration error; destroying twice is a no-op.
    pub fn destroy(&mut self) {
        if self.phase == RenderPhase::Destroyed {
            return;
        }
        self.release_layers();
        self.surface = None;
        self.cache.clear();
        self.phase = RenderPhase::Destroyed;
        tracing::info!("Grid renderer destroyed");
    }

    fn release_layers(&mut self) {
        if let (Some(surface), Some(layers)) = (&self.surface, self.layers.take()) {
            let mut guard = surface.lock();
            if guard.contains(layers.layer) {
                if let Err(e) = guard.destroy(layers.layer) {
                    tracing::error!("Failed to remove grid layer: {}", e);
                }
            }
        }
    }

    fn report_limit(&self, kind: PrimitiveKind, limit: usize) {
        tracing::warn!("{:?} budget of {} reached, grid truncated", kind, limit);
        self.publish(RenderEvent::PrimitiveLimitReached { kind, limit });
    }

    fn publish(&self, event: RenderEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.publish(AppEvent::Render(event));
        }
    }
}
