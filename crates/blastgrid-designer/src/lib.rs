//! # BlastGrid Designer
//!
//! The drilling-pattern canvas engine: it turns pattern state into a drawn
//! grid of drill points and keeps that state consistent while it is edited.
//!
//! ## Core Components
//!
//! - **Coordinates**: grid-space to canvas-space mapping and lattice snapping
//! - **Drill points**: id allocation, lattice generation, placement checks
//! - **Pitch estimation**: recover spacing/burden from surveyed positions
//! - **Surface**: retained-mode scene abstraction plus an in-memory scene
//! - **Grid renderer**: cached, budget-bounded grid lines and intersections
//! - **Point renderer**: point markers, custom-depth cues, hover tooltips
//! - **Pattern store**: immutable-snapshot state container
//! - **Persistence**: validated save/load/export against a key-value store
//! - **Raster**: PNG preview of an in-memory scene
//!
//! ## Architecture
//!
//! ```text
//! pointer events ──> PatternStateStore ──> snapshots (watch) / events (bus)
//!                          │
//!        ┌─────────────────┴─────────────────┐
//!  GridRenderingEngine              DrillPointRenderer
//!        └──────────> DrawingSurface <───────┘
//!
//! PatternStateStore ──save/load──> PatternPersistenceGateway ──> KeyValueStore
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blastgrid_designer::{shared, GridRenderingEngine, MemorySurface};
//!
//! let surface = shared(MemorySurface::new(800.0, 600.0));
//! let mut grid = GridRenderingEngine::from_config(&config);
//! grid.initialize(surface.clone())?;
//! grid.set_grid_pitch(3.0, 2.5)?;
//! grid.render()?;
//! ```

pub mod color;
pub mod coordinates;
pub mod drill_points;
pub mod grid_renderer;
pub mod pattern_store;
pub mod persistence;
pub mod pitch;
pub mod point_renderer;
pub mod raster;
pub mod surface;

pub use coordinates::{
    canvas_to_grid, grid_to_canvas, snap, snap_to_grid, CanvasGeometry, ViewTransform,
};
pub use drill_points::{
    check_placement, distance, get_points_with_custom_depths, has_custom_depth, nearest_point,
    validate_coordinates, validate_point_count, validate_unique_coordinates, DrillPointFactory,
    GridPatternSpec, PlacementError,
};
pub use grid_renderer::{
    compute_grid, GridParams, GridPrimitives, GridRenderingEngine, RenderOutcome, RenderPhase,
    RenderStats,
};
pub use pattern_store::{PatternStateStore, StoreOptions, DUPLICATE_MESSAGE_TIMEOUT};
pub use persistence::{
    parse_storage_key, storage_key, FileStore, KeyValueStore, MemoryStore,
    PatternPersistenceGateway, StoredPattern,
};
pub use pitch::{GridPitch, GridPitchEstimator, PitchEstimatorConfig, FALLBACK_PITCH};
pub use point_renderer::{point_colors, DrillPointRenderer, PointColors, PointVisual};
pub use raster::{rasterize, save_png};
pub use surface::{
    shared, DrawingSurface, GroupAttrs, MemorySurface, NodeId, Primitive, Shape, SharedSurface,
    StageInfo, Style, SurfaceError, SurfaceResult,
};
