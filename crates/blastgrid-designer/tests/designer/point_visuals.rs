use blastgrid_core::{DrillPoint, PatternSettings, PatternState};
use blastgrid_designer::point_renderer::{
    CUSTOM_DEPTH_COLORS, DEFAULT_COLORS, POINT_GROUP_NAME, SELECTED_COLORS, TOOLTIP_NAME,
};
use blastgrid_designer::{
    CanvasGeometry, DrawingSurface, DrillPointRenderer, GroupAttrs, MemorySurface, NodeId,
    ViewTransform,
};

fn setup() -> (DrillPointRenderer, MemorySurface, NodeId) {
    let mut surface = MemorySurface::new(800.0, 600.0);
    let root = surface.root();
    let layer = surface
        .create_group(root, GroupAttrs::named("drill-points"))
        .unwrap();
    (
        DrillPointRenderer::new(CanvasGeometry::default()),
        surface,
        layer,
    )
}

fn state() -> PatternState {
    let mut state = PatternState::new(1, 1, PatternSettings::default()).with_points(vec![
        DrillPoint::new("DH1", 0.0, 0.0, 10.0, 3.0, 2.5),
        DrillPoint::new("DH2", 3.0, 0.0, 15.0, 3.0, 2.5),
        DrillPoint::new("DH3", 6.0, 0.0, 10.005, 3.0, 2.5),
    ]);
    state.selected_point = Some(state.drill_points[2].clone());
    state
}

fn named<'a>(surface: &'a MemorySurface, group: NodeId, name: &str) -> Vec<&'a blastgrid_designer::Primitive> {
    surface
        .primitives(group)
        .unwrap()
        .into_iter()
        .filter(|p| p.name.as_deref() == Some(name))
        .collect()
}

#[test]
fn visuals_follow_selection_and_depth() {
    let (mut renderer, mut surface, layer) = setup();
    let state = state();
    let view = ViewTransform::default();
    let visuals = renderer
        .render_points(&mut surface, layer, &state, &view)
        .unwrap();

    assert_eq!(visuals.len(), 3);
    assert_eq!(surface.find_groups(layer, POINT_GROUP_NAME).unwrap().len(), 3);

    let expected = [DEFAULT_COLORS, CUSTOM_DEPTH_COLORS, SELECTED_COLORS];
    for (visual, colors) in visuals.iter().zip(expected) {
        let marker = named(&surface, visual.node, "marker");
        assert_eq!(marker.len(), 1);
        assert_eq!(marker[0].style.fill.as_deref(), Some(colors.fill));
        assert_eq!(marker[0].style.stroke.as_deref(), Some(colors.stroke));
        assert_eq!(marker[0].style.stroke_width, colors.stroke_width);
    }

    // Only DH2 deviates from the 10 m global depth beyond tolerance.
    let custom: Vec<bool> = visuals.iter().map(|v| v.custom_depth).collect();
    assert_eq!(custom, vec![false, true, false]);
    assert_eq!(named(&surface, visuals[1].node, "depth-indicator").len(), 1);
    assert!(named(&surface, visuals[0].node, "depth-indicator").is_empty());
}

#[test]
fn visual_is_positioned_at_canvas_coordinates() {
    let (renderer, mut surface, layer) = setup();
    let geometry = CanvasGeometry::default();
    let view = ViewTransform::new(2.0, 15.0, -10.0);
    let point = DrillPoint::new("DH7", 3.0, 2.5, 10.0, 3.0, 2.5);

    let visual = renderer
        .create_drill_point_visual(&mut surface, layer, &point, &view, false, false, None)
        .unwrap();
    let attrs = surface.group_attrs(visual.node).unwrap();
    let (x, y) = geometry.to_canvas(3.0, 2.5, &view);
    assert_eq!((attrs.x, attrs.y), (x, y));

    let label = named(&surface, visual.node, "label");
    assert_eq!(label.len(), 1);
}

#[test]
fn placement_mode_disables_dragging() {
    let (renderer, mut surface, layer) = setup();
    let view = ViewTransform::default();
    let point = DrillPoint::new("DH1", 0.0, 0.0, 10.0, 3.0, 2.5);

    let placing = renderer
        .create_drill_point_visual(&mut surface, layer, &point, &view, true, false, Some(10.0))
        .unwrap();
    let editing = renderer
        .create_drill_point_visual(&mut surface, layer, &point, &view, false, false, Some(10.0))
        .unwrap();
    assert!(!surface.group_attrs(placing.node).unwrap().draggable);
    assert!(surface.group_attrs(editing.node).unwrap().draggable);

    renderer
        .update_point_selectability(&mut surface, &[placing.clone(), editing.clone()], false)
        .unwrap();
    assert!(surface.group_attrs(placing.node).unwrap().draggable);
    assert!(surface.group_attrs(editing.node).unwrap().draggable);

    renderer
        .update_point_selectability(&mut surface, &[placing.clone(), editing.clone()], true)
        .unwrap();
    assert!(!surface.group_attrs(placing.node).unwrap().draggable);
    assert!(!surface.group_attrs(editing.node).unwrap().draggable);
}

#[test]
fn hover_tooltip_never_leaks() {
    let (mut renderer, mut surface, layer) = setup();
    let state = state();
    let view = ViewTransform::default();
    let visuals = renderer
        .render_points(&mut surface, layer, &state, &view)
        .unwrap();
    let baseline = surface.node_count();

    let first = renderer
        .on_hover_enter(&mut surface, &visuals[0], &state.drill_points[0], Some(10.0))
        .unwrap();
    assert_eq!(renderer.active_tooltip(), Some(first));
    assert_eq!(surface.find_groups(visuals[0].node, TOOLTIP_NAME).unwrap().len(), 1);

    // Entering another point without leaving the first moves the tooltip.
    let second = renderer
        .on_hover_enter(&mut surface, &visuals[1], &state.drill_points[1], Some(10.0))
        .unwrap();
    assert!(!surface.contains(first));
    assert!(surface.contains(second));
    assert!(surface.find_groups(visuals[0].node, TOOLTIP_NAME).unwrap().is_empty());
    assert!(named(&surface, visuals[0].node, "point-highlight").is_empty());
    assert_eq!(named(&surface, visuals[1].node, "point-highlight").len(), 1);

    renderer.on_hover_leave(&mut surface).unwrap();
    renderer.on_hover_leave(&mut surface).unwrap();
    assert_eq!(renderer.active_tooltip(), None);
    assert_eq!(surface.node_count(), baseline);
}

#[test]
fn custom_depth_tooltip_shows_global_depth() {
    let (mut renderer, mut surface, layer) = setup();
    let state = state();
    let visuals = renderer
        .render_points(&mut surface, layer, &state, &ViewTransform::default())
        .unwrap();

    let tooltip = renderer
        .on_hover_enter(&mut surface, &visuals[1], &state.drill_points[1], Some(10.0))
        .unwrap();
    // Background plus id, position, depth and global depth lines.
    assert_eq!(surface.child_count(tooltip).unwrap(), 5);

    let tooltip = renderer
        .on_hover_enter(&mut surface, &visuals[0], &state.drill_points[0], Some(10.0))
        .unwrap();
    assert_eq!(surface.child_count(tooltip).unwrap(), 4);
}

#[test]
fn rerender_drops_stale_hover() {
    let (mut renderer, mut surface, layer) = setup();
    let state = state();
    let view = ViewTransform::default();
    let visuals = renderer
        .render_points(&mut surface, layer, &state, &view)
        .unwrap();
    renderer
        .on_hover_enter(&mut surface, &visuals[0], &state.drill_points[0], None)
        .unwrap();

    renderer
        .render_points(&mut surface, layer, &state, &view)
        .unwrap();
    assert_eq!(renderer.active_tooltip(), None);
    renderer.on_hover_leave(&mut surface).unwrap();
    assert_eq!(surface.find_groups(layer, POINT_GROUP_NAME).unwrap().len(), 3);
}
