use blastgrid_core::{
    validate, DrillPoint, PatternSettings, PatternState, ValidationCode, MAX_DRILL_POINTS,
};

fn lattice(rows: usize, cols: usize) -> Vec<DrillPoint> {
    let mut points = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let n = points.len() + 1;
            points.push(DrillPoint::new(
                format!("DH{}", n),
                c as f64 * 3.0,
                r as f64 * 2.5,
                10.0,
                3.0,
                2.5,
            ));
        }
    }
    points
}

#[test]
fn test_clean_lattice_is_valid() {
    let state = PatternState::new(5, 9, PatternSettings::default()).with_points(lattice(4, 6));
    let result = validate(&state);
    assert!(result.is_valid);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_point_limit_is_inclusive() {
    let at_limit = PatternState::default().with_points(lattice(20, 25));
    assert_eq!(at_limit.point_count(), MAX_DRILL_POINTS);
    assert!(validate(&at_limit).is_valid);

    let mut points = lattice(20, 25);
    points.push(DrillPoint::new("DH501", 100.0, 100.0, 10.0, 3.0, 2.5));
    let over = PatternState::default().with_points(points);
    assert!(validate(&over).has_error(ValidationCode::TooManyPoints));
}

#[test]
fn test_multiple_errors_reported_together() {
    let mut state = PatternState::default().with_points(vec![
        DrillPoint::new("DH1", 1.0, 1.0, 10.0, 3.0, 2.5),
        DrillPoint::new("DH1", 1.005, 1.0, 10.0, 3.0, 2.5),
    ]);
    state.settings.depth = 0.0;

    let result = validate(&state);
    assert!(!result.is_valid);
    assert!(result.has_error(ValidationCode::InvalidDepth));
    assert!(result.has_error(ValidationCode::DuplicatePoints));
    assert!(result.has_error(ValidationCode::DuplicateIds));
    assert_eq!(
        result.error_messages()[0],
        "Depth must be between 0 and 50 meters"
    );
}

#[test]
fn test_depth_upper_bound() {
    let mut state = PatternState::default().with_points(lattice(1, 1));
    state.settings.depth = 50.0;
    state.drill_points = vec![DrillPoint::new("DH1", 0.0, 0.0, 50.0, 3.0, 2.5)].into();
    assert!(validate(&state).is_valid);

    state.settings.depth = 50.01;
    assert!(validate(&state).has_error(ValidationCode::InvalidDepth));
}
