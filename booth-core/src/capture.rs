//! Capture geometry engine.
//!
//! Normalizes arbitrary camera frame dimensions into a crop rectangle and
//! canvas size with exactly the target aspect ratio, centered on the source
//! frame. Cropping always shrinks the wider dimension; frames are never
//! letterboxed. There is no failure path: unusable inputs fall back to
//! orientation-appropriate defaults.

use crate::types::Orientation;

/// Viewport width at and above which capture is forced to landscape
pub const DESKTOP_BREAKPOINT: f64 = 1024.0;

/// Tolerance before the source rectangle is cropped to the target aspect
const ASPECT_EPSILON: f64 = 0.001;

/// Derived crop/canvas geometry for one capture. Stateless; recomputed per
/// capture from the live video dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureGeometry {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub source_width: f64,
    pub source_height: f64,
    pub source_x: f64,
    pub source_y: f64,
    pub aspect: f64,
}

fn ensure_positive(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

/// Compute the source crop rectangle and destination canvas size for a raw
/// video frame. `rotate` swaps the effective axes for sensors that deliver
/// frames rotated relative to the desired orientation.
pub fn compute_capture_geometry(
    video_width: f64,
    video_height: f64,
    orientation: Orientation,
    rotate: bool,
) -> CaptureGeometry {
    let target_aspect = orientation.target_aspect();
    let (default_width, default_height) = orientation.default_dimensions();
    let safe_width = ensure_positive(video_width, default_width);
    let safe_height = ensure_positive(video_height, default_height);

    let effective_width = if rotate { safe_height } else { safe_width };
    let effective_height = if rotate { safe_width } else { safe_height };
    let effective_aspect = ensure_positive(effective_width / effective_height, target_aspect);

    let mut crop_width = effective_width;
    let mut crop_height = effective_height;

    if (effective_aspect - target_aspect).abs() > ASPECT_EPSILON {
        if effective_aspect > target_aspect {
            crop_width = crop_height * target_aspect;
        } else {
            crop_height = crop_width / target_aspect;
        }
    }

    let source_width = if rotate { crop_height } else { crop_width };
    let source_height = if rotate { crop_width } else { crop_height };

    let source_x = ((safe_width - source_width) / 2.0).max(0.0);
    let source_y = ((safe_height - source_height) / 2.0).max(0.0);

    CaptureGeometry {
        canvas_width: crop_width.round() as u32,
        canvas_height: crop_height.round() as u32,
        source_width,
        source_height,
        source_x,
        source_y,
        aspect: target_aspect,
    }
}

/// Observed viewport, fed to [`resolve_orientation`]. The media-query answer
/// is `None` when the environment has no `(orientation: portrait)` query.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub portrait_media_query: Option<bool>,
}

/// Decide portrait vs landscape for the capture target.
///
/// Precedence: desktop breakpoint forces landscape, then the media-query
/// answer, then the numeric viewport fallback. A missing viewport
/// (non-interactive environment) resolves to landscape.
pub fn resolve_orientation(viewport: Option<Viewport>) -> Orientation {
    let Some(viewport) = viewport else {
        return Orientation::Landscape;
    };

    if viewport.width >= DESKTOP_BREAKPOINT {
        return Orientation::Landscape;
    }

    if let Some(true) = viewport.portrait_media_query {
        return Orientation::Portrait;
    }

    if viewport.height >= viewport.width {
        Orientation::Portrait
    } else {
        Orientation::Landscape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_frame_to_portrait_with_rotate_is_centered() {
        let geometry =
            compute_capture_geometry(1920.0, 1080.0, Orientation::Portrait, true);

        let aspect = geometry.canvas_width as f64 / geometry.canvas_height as f64;
        assert!((aspect - 9.0 / 16.0).abs() < 0.01);

        // Source rectangle stays inside the original frame and is centered.
        assert!(geometry.source_x >= 0.0);
        assert!(geometry.source_y >= 0.0);
        assert!(geometry.source_x + geometry.source_width <= 1920.0 + 1e-6);
        assert!(geometry.source_y + geometry.source_height <= 1080.0 + 1e-6);
        let right_gap = 1920.0 - geometry.source_width - geometry.source_x;
        let bottom_gap = 1080.0 - geometry.source_height - geometry.source_y;
        assert!((geometry.source_x - right_gap).abs() < 1e-6);
        assert!((geometry.source_y - bottom_gap).abs() < 1e-6);
    }

    #[test]
    fn matching_aspect_is_left_uncropped() {
        let geometry =
            compute_capture_geometry(1920.0, 1080.0, Orientation::Landscape, false);
        assert_eq!(geometry.canvas_width, 1920);
        assert_eq!(geometry.canvas_height, 1080);
        assert_eq!(geometry.source_x, 0.0);
        assert_eq!(geometry.source_y, 0.0);
    }

    #[test]
    fn unusable_dimensions_fall_back_to_defaults() {
        let geometry = compute_capture_geometry(f64::NAN, -5.0, Orientation::Portrait, false);
        assert_eq!(geometry.canvas_width, 1080);
        assert_eq!(geometry.canvas_height, 1920);

        let geometry = compute_capture_geometry(0.0, f64::INFINITY, Orientation::Landscape, false);
        assert_eq!(geometry.canvas_width, 1920);
        assert_eq!(geometry.canvas_height, 1080);
    }

    #[test]
    fn wide_frame_crops_width_not_height() {
        let geometry =
            compute_capture_geometry(4000.0, 1080.0, Orientation::Landscape, false);
        assert_eq!(geometry.canvas_height, 1080);
        assert!(geometry.canvas_width < 4000);
        let aspect = geometry.canvas_width as f64 / geometry.canvas_height as f64;
        assert!((aspect - 16.0 / 9.0).abs() < 0.01);
    }

    #[test]
    fn orientation_resolution_precedence() {
        // No viewport: non-interactive default.
        assert_eq!(resolve_orientation(None), Orientation::Landscape);

        // Desktop breakpoint wins over everything else.
        let desktop = Viewport {
            width: 1400.0,
            height: 2000.0,
            portrait_media_query: Some(true),
        };
        assert_eq!(resolve_orientation(Some(desktop)), Orientation::Landscape);

        // Media query answer wins below the breakpoint.
        let phone = Viewport {
            width: 800.0,
            height: 400.0,
            portrait_media_query: Some(true),
        };
        assert_eq!(resolve_orientation(Some(phone)), Orientation::Portrait);

        // Numeric fallback when no media query is available.
        let tall = Viewport {
            width: 400.0,
            height: 800.0,
            portrait_media_query: None,
        };
        assert_eq!(resolve_orientation(Some(tall)), Orientation::Portrait);
        let wide = Viewport {
            width: 800.0,
            height: 400.0,
            portrait_media_query: None,
        };
        assert_eq!(resolve_orientation(Some(wide)), Orientation::Landscape);
    }
}
