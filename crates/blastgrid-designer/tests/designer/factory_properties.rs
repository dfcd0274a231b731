use blastgrid_core::PatternSettings;
use blastgrid_designer::{CanvasGeometry, DrillPointFactory, GridPatternSpec, ViewTransform};
use proptest::prelude::*;

fn is_multiple(value: f64, step: f64) -> bool {
    let ratio = value / step;
    (ratio - ratio.round()).abs() < 1e-6
}

fn pitch() -> impl Strategy<Value = f64> {
    (10u32..1000).prop_map(|hundredths| hundredths as f64 / 100.0)
}

proptest! {
    #[test]
    fn precise_points_sit_on_the_lattice(
        spacing in pitch(),
        burden in pitch(),
        x in -200.0f64..200.0,
        y in -200.0f64..200.0,
    ) {
        let factory = DrillPointFactory::new();
        let settings = PatternSettings::new(spacing, burden, 10.0);
        let point = factory.create_drill_point(x, y, &settings, true);
        prop_assert!(is_multiple(point.x, spacing), "{} is not a multiple of {}", point.x, spacing);
        prop_assert!(is_multiple(point.y, burden), "{} is not a multiple of {}", point.y, burden);
    }

    #[test]
    fn free_points_keep_two_decimals(x in -200.0f64..200.0, y in -200.0f64..200.0) {
        let factory = DrillPointFactory::new();
        let point = factory.create_drill_point(x, y, &PatternSettings::default(), false);
        prop_assert!((point.x - x).abs() <= 0.005 + 1e-9);
        prop_assert!((point.y - y).abs() <= 0.005 + 1e-9);
    }

    #[test]
    fn canvas_round_trip(
        gx in -100.0f64..100.0,
        gy in -100.0f64..100.0,
        scale in 0.1f64..10.0,
        ox in -500.0f64..500.0,
        oy in -500.0f64..500.0,
    ) {
        let geometry = CanvasGeometry::default();
        let view = ViewTransform::new(scale, ox, oy);
        let (cx, cy) = geometry.to_canvas(gx, gy, &view);
        let (x, y) = geometry.to_grid(cx, cy, &view);
        prop_assert!((x - gx).abs() < 1e-6);
        prop_assert!((y - gy).abs() < 1e-6);
    }
}

#[test]
fn numbering_survives_reload() {
    let factory = DrillPointFactory::new();
    let settings = PatternSettings::new(3.0, 2.5, 10.0);
    let spec = GridPatternSpec::from_settings(3, 3, &settings);
    let loaded = factory.generate_grid_pattern(&spec);

    factory.reset_numbering();
    assert_eq!(factory.create_drill_point(0.0, 0.0, &settings, false).id, "DH1");

    factory.reconcile_numbering(&loaded);
    let fresh = factory.create_drill_point(0.0, 0.0, &settings, false);
    assert!(loaded.iter().all(|p| p.id != fresh.id));
    assert_eq!(fresh.id, "DH10");
}
