use blastgrid_core::{AppEvent, EventBus, EventFilter, GridPosition, PatternError, RenderEvent};
use blastgrid_designer::{
    shared, CanvasGeometry, DrawingSurface, GridRenderingEngine, MemorySurface, RenderPhase,
    SharedSurface, ViewTransform,
};
use blastgrid_settings::RenderSettings;
use parking_lot::Mutex;
use std::sync::Arc;

fn engine_with(
    limits: RenderSettings,
) -> (GridRenderingEngine<MemorySurface>, SharedSurface<MemorySurface>) {
    let surface = shared(MemorySurface::new(800.0, 600.0));
    let mut engine = GridRenderingEngine::new(CanvasGeometry::default(), limits, "#e0e0e0");
    engine.initialize(surface.clone()).unwrap();
    engine.set_grid_pitch(3.0, 2.5).unwrap();
    (engine, surface)
}

fn engine() -> (GridRenderingEngine<MemorySurface>, SharedSurface<MemorySurface>) {
    engine_with(RenderSettings::default())
}

fn grid_primitive_count(surface: &SharedSurface<MemorySurface>) -> usize {
    let surface = surface.lock();
    let layer = surface.find_groups(surface.root(), "grid-layer").unwrap()[0];
    ["grid-lines", "grid-intersections"]
        .iter()
        .map(|name| {
            let group = surface.find_groups(layer, name).unwrap()[0];
            surface.child_count(group).unwrap()
        })
        .sum()
}

fn highlight_count(surface: &SharedSurface<MemorySurface>) -> usize {
    let surface = surface.lock();
    let layer = surface.find_groups(surface.root(), "grid-layer").unwrap()[0];
    surface
        .primitives(layer)
        .unwrap()
        .iter()
        .filter(|p| p.name.as_deref() == Some("highlight"))
        .count()
}

#[test]
fn second_identical_render_hits_cache() {
    let (mut engine, surface) = engine();

    let first = engine.render().unwrap();
    let hits_after_first = engine.stats().cache_hits;
    let drawn_after_miss = grid_primitive_count(&surface);

    let second = engine.render().unwrap();
    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert!(engine.stats().cache_hits > hits_after_first);
    assert_eq!(first.primitives, second.primitives);
    assert_eq!(grid_primitive_count(&surface), drawn_after_miss);
    assert_eq!(drawn_after_miss, first.primitives);

    let stats = engine.stats();
    assert_eq!(stats.render_count, 2);
    assert_eq!(stats.cache_size, 1);
    assert_eq!(stats.hit_rate(), 0.5);
}

#[test]
fn pan_changes_key_and_returning_hits() {
    let (mut engine, _surface) = engine();
    engine.render().unwrap();

    engine.set_view(ViewTransform::new(1.0, 40.0, 0.0));
    assert!(!engine.render().unwrap().cache_hit);

    engine.set_view(ViewTransform::default());
    assert!(engine.render().unwrap().cache_hit);
    assert_eq!(engine.stats().cache_size, 2);
}

#[test]
fn sub_pixel_pan_shares_cache_entry() {
    let (mut engine, _surface) = engine();
    engine.set_view(ViewTransform::new(1.0, 10.2, 5.1));
    engine.render().unwrap();
    engine.set_view(ViewTransform::new(1.0, 10.4, 4.9));
    assert!(engine.render().unwrap().cache_hit);
}

#[test]
fn setters_validate_and_invalidate() {
    let (mut engine, _surface) = engine();
    engine.render().unwrap();
    assert_eq!(engine.stats().cache_size, 1);

    assert!(matches!(
        engine.set_grid_spacing(0.0),
        Err(PatternError::InvalidArgument { name: "spacing", .. })
    ));
    assert!(matches!(
        engine.set_grid_color("  "),
        Err(PatternError::InvalidArgument { name: "color", .. })
    ));
    assert_eq!(engine.stats().cache_size, 1);

    engine.set_grid_color("#336699").unwrap();
    assert_eq!(engine.stats().cache_size, 0);
    assert!(!engine.render().unwrap().cache_hit);

    engine.set_grid_spacing(5.0).unwrap();
    assert_eq!(engine.grid_spacing(), (5.0, 5.0));
    assert_eq!(engine.stats().cache_size, 0);
}

#[test]
fn cache_is_bounded() {
    let (mut engine, _surface) = engine_with(RenderSettings {
        max_cache_size: 2,
        ..Default::default()
    });
    for offset in [0.0, 30.0, 60.0, 90.0] {
        engine.set_view(ViewTransform::new(1.0, offset, 0.0));
        engine.render().unwrap();
    }
    assert_eq!(engine.stats().cache_size, 2);

    engine.set_view(ViewTransform::new(1.0, 0.0, 0.0));
    assert!(!engine.render().unwrap().cache_hit);
}

#[test]
fn caching_can_be_disabled() {
    let (mut engine, _surface) = engine();
    engine.enable_caching(false);
    engine.render().unwrap();
    engine.render().unwrap();
    assert_eq!(engine.stats().cache_hits, 0);
    assert_eq!(engine.stats().cache_size, 0);
}

#[test]
fn precise_mode_adds_intersections() {
    let (mut engine, surface) = engine();
    let plain = engine.render().unwrap().primitives;

    engine.show_precise_mode(true).unwrap();
    let precise = engine.render().unwrap();
    assert!(!precise.cache_hit);
    assert!(precise.primitives > plain);

    let guard = surface.lock();
    let layer = guard.find_groups(guard.root(), "grid-layer").unwrap()[0];
    let markers = guard.find_groups(layer, "grid-intersections").unwrap()[0];
    assert!(guard.group_attrs(markers).unwrap().visible);
}

#[test]
fn zoomed_out_grid_is_bounded() {
    let (mut engine, surface) = engine_with(RenderSettings {
        max_grid_lines: 100,
        ..Default::default()
    });
    engine.show_precise_mode(true).unwrap();
    engine.set_view(ViewTransform::new(0.1, 0.0, 0.0));
    let outcome = engine.render().unwrap();
    assert_eq!(outcome.primitives, 100 + 25);
    assert_eq!(grid_primitive_count(&surface), 125);
}

#[test]
fn highlight_replaces_previous_highlights() {
    let (mut engine, surface) = engine();
    engine.render().unwrap();
    let points = [
        GridPosition::new(3.0, 2.5),
        GridPosition::new(6.0, 2.5),
        GridPosition::new(9.0, 5.0),
    ];
    engine.highlight_intersections(&points).unwrap();
    engine.highlight_intersections(&points).unwrap();
    assert_eq!(highlight_count(&surface), 3);

    engine.highlight_intersections(&points[..1]).unwrap();
    assert_eq!(highlight_count(&surface), 1);

    engine.clear().unwrap();
    assert_eq!(highlight_count(&surface), 0);
    assert_eq!(grid_primitive_count(&surface), 0);
}

#[test]
fn destroy_is_terminal() {
    let (mut engine, surface) = engine();
    engine.render().unwrap();
    engine.destroy();
    engine.destroy();

    assert_eq!(engine.phase(), RenderPhase::Destroyed);
    assert!(matches!(engine.render(), Err(PatternError::Configuration { .. })));
    assert!(engine.initialize(surface.clone()).is_err());
    assert_eq!(surface.lock().node_count(), 1);
}

#[test]
fn hidden_grid_hides_layer() {
    let (mut engine, surface) = engine();
    engine.set_visible(false).unwrap();
    assert!(!engine.is_visible());
    let guard = surface.lock();
    let layer = guard.find_groups(guard.root(), "grid-layer").unwrap()[0];
    assert!(!guard.group_attrs(layer).unwrap().visible);
}

#[test]
fn render_events_report_cache_hits() {
    let bus = Arc::new(EventBus::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe(EventFilter::All, move |event| {
        if let AppEvent::Render(RenderEvent::GridRendered { cache_hit, .. }) = event {
            sink.lock().push(cache_hit);
        }
    });

    let surface = shared(MemorySurface::new(640.0, 480.0));
    let mut engine =
        GridRenderingEngine::new(CanvasGeometry::default(), RenderSettings::default(), "#ccc")
            .with_event_bus(bus);
    engine.initialize(surface).unwrap();
    engine.render().unwrap();
    engine.update().unwrap();

    assert_eq!(*seen.lock(), vec![false, true]);
}
