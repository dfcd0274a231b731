use blastgrid_core::DrillPoint;
use proptest::prelude::*;

proptest! {
    #[test]
    fn custom_depth_is_symmetric(global in 0.5f64..50.0, delta in 0.02f64..20.0) {
        let above = DrillPoint::new("DH1", 0.0, 0.0, global + delta, 3.0, 2.5);
        let below = DrillPoint::new("DH2", 0.0, 0.0, global - delta, 3.0, 2.5);
        prop_assert!(above.has_custom_depth(global));
        prop_assert!(below.has_custom_depth(global));
    }

    #[test]
    fn depth_within_tolerance_is_not_custom(global in 0.5f64..50.0, delta in -0.009f64..0.009) {
        let point = DrillPoint::new("DH1", 0.0, 0.0, global + delta, 3.0, 2.5);
        prop_assert!(!point.has_custom_depth(global));
    }
}
