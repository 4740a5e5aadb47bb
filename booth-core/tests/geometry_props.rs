//! Property tests for the capture geometry engine.

use booth_core::{compute_capture_geometry, Orientation};
use proptest::prelude::*;

fn orientations() -> impl Strategy<Value = Orientation> {
    prop_oneof![Just(Orientation::Portrait), Just(Orientation::Landscape)]
}

proptest! {
    /// For all valid (width, height, orientation, rotate) combinations the
    /// output aspect ratio matches the target within the crop epsilon.
    #[test]
    fn output_aspect_matches_target(
        width in 1.0f64..8192.0,
        height in 1.0f64..8192.0,
        orientation in orientations(),
        rotate in any::<bool>(),
    ) {
        let geometry = compute_capture_geometry(width, height, orientation, rotate);
        let target = orientation.target_aspect();

        // Pre-rounding crop dimensions carry the exact ratio; the rounded
        // canvas can deviate by at most one pixel per axis.
        let canvas_aspect = geometry.canvas_width as f64 / geometry.canvas_height as f64;
        let tolerance = target * (1.0 / geometry.canvas_height as f64 + 1.0 / geometry.canvas_width as f64) + 0.001;
        prop_assert!((canvas_aspect - target).abs() <= tolerance,
            "aspect {} vs target {} for {}x{} rotate={}",
            canvas_aspect, target, width, height, rotate);
    }

    /// The source rectangle always lies fully within the original frame.
    #[test]
    fn source_rect_stays_in_bounds(
        width in 1.0f64..8192.0,
        height in 1.0f64..8192.0,
        orientation in orientations(),
        rotate in any::<bool>(),
    ) {
        let geometry = compute_capture_geometry(width, height, orientation, rotate);

        prop_assert!(geometry.source_x >= 0.0);
        prop_assert!(geometry.source_y >= 0.0);
        prop_assert!(geometry.source_width > 0.0);
        prop_assert!(geometry.source_height > 0.0);
        prop_assert!(geometry.source_x + geometry.source_width <= width + 1e-6);
        prop_assert!(geometry.source_y + geometry.source_height <= height + 1e-6);
    }

    /// Garbage dimensions never panic and always yield a usable geometry.
    #[test]
    fn never_fails_on_degenerate_input(
        width in prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(-1.0), Just(0.0), 1.0f64..4096.0],
        height in prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(-1.0), Just(0.0), 1.0f64..4096.0],
        orientation in orientations(),
        rotate in any::<bool>(),
    ) {
        let geometry = compute_capture_geometry(width, height, orientation, rotate);
        prop_assert!(geometry.canvas_width > 0);
        prop_assert!(geometry.canvas_height > 0);
        prop_assert!(geometry.aspect > 0.0);
    }
}
