//! Watermark loading and application for the upload path.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::frame::overlay_watermark;
use crate::MediaResult;

/// Holds the decoded watermark overlay, if one is configured and loadable.
/// Application is best-effort: any trouble degrades to the original bytes,
/// because an unmarked upload beats a failed one.
pub struct Watermarker {
    overlay: Option<RgbaImage>,
}

impl Watermarker {
    /// Load the overlay from an optional asset path. A missing or
    /// undecodable asset disables watermarking with a warning.
    pub fn from_path(path: Option<&Path>) -> Self {
        let overlay = path.and_then(|p| match image::open(p) {
            Ok(img) => Some(img.to_rgba8()),
            Err(err) => {
                tracing::warn!(path = %p.display(), error = %err, "watermark asset unavailable");
                None
            }
        });
        Self { overlay }
    }

    /// Watermarking disabled entirely
    pub fn disabled() -> Self {
        Self { overlay: None }
    }

    /// Build directly from a decoded overlay (test seam)
    pub fn from_overlay(overlay: RgbaImage) -> Self {
        Self {
            overlay: Some(overlay),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.overlay.is_some()
    }

    /// The raw overlay for callers that composite frames themselves
    pub fn overlay(&self) -> Option<&RgbaImage> {
        self.overlay.as_ref()
    }

    /// Apply the watermark to an encoded image, re-encoding in the source
    /// format (JPEG stays JPEG, everything else becomes PNG). Degrades to
    /// the original bytes on any failure.
    pub fn apply(&self, image_bytes: &[u8]) -> Vec<u8> {
        let Some(mark) = &self.overlay else {
            return image_bytes.to_vec();
        };

        match apply_overlay(image_bytes, mark) {
            Ok(stamped) => stamped,
            Err(err) => {
                tracing::warn!(error = %err, "watermark application failed, uploading original");
                image_bytes.to_vec()
            }
        }
    }
}

fn apply_overlay(image_bytes: &[u8], mark: &RgbaImage) -> MediaResult<Vec<u8>> {
    let format = image::guess_format(image_bytes).unwrap_or(ImageFormat::Png);
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| crate::MediaError::decode(e.to_string()))?;

    let mut canvas = decoded.to_rgba8();
    overlay_watermark(&mut canvas, mark);

    let mut out = Cursor::new(Vec::new());
    match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgba8(canvas)
            .to_rgb8()
            .write_to(&mut out, ImageFormat::Jpeg)
            .map_err(|e| crate::MediaError::encode(e.to_string()))?,
        _ => canvas
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| crate::MediaError::encode(e.to_string()))?,
    }
    Ok(out.into_inner())
}
