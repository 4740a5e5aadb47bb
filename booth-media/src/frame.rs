//! Square frame composition: scale to fill and crop the overflow, centered.
//! Letterboxing would distort the before/after comparison, so the wider
//! dimension always loses pixels instead.

use image::imageops::FilterType;
use image::RgbaImage;

use crate::{MediaError, MediaResult};

/// Watermark width as a fraction of the canvas width
const WATERMARK_WIDTH_RATIO: f64 = 0.2;

/// Watermark margin as a fraction of the canvas's smaller dimension
const WATERMARK_MARGIN_RATIO: f64 = 0.04;

/// Decode `image_bytes` onto a `size` x `size` canvas with center-crop
/// fill, optionally compositing the watermark bottom-right.
pub fn compose_square(
    image_bytes: &[u8],
    size: u32,
    watermark: Option<&RgbaImage>,
) -> MediaResult<RgbaImage> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| MediaError::decode(e.to_string()))?;

    let mut canvas = decoded
        .resize_to_fill(size, size, FilterType::Triangle)
        .to_rgba8();

    if let Some(mark) = watermark {
        overlay_watermark(&mut canvas, mark);
    }

    Ok(canvas)
}

/// Composite the watermark in the bottom-right corner: 20% of the canvas
/// width, preserving the mark's aspect, with a margin of at least 10px or
/// 4% of the smaller canvas dimension.
pub fn overlay_watermark(canvas: &mut RgbaImage, mark: &RgbaImage) {
    let (width, height) = canvas.dimensions();
    if mark.width() == 0 || mark.height() == 0 || width == 0 || height == 0 {
        return;
    }

    let target_width = ((width as f64 * WATERMARK_WIDTH_RATIO).round() as u32).max(1);
    let aspect = mark.width() as f64 / mark.height() as f64;
    let target_height = ((target_width as f64 / aspect).round() as u32).max(1);
    let margin = ((width.min(height) as f64 * WATERMARK_MARGIN_RATIO).round() as u32).max(10);

    let scaled = image::imageops::resize(mark, target_width, target_height, FilterType::Triangle);
    let x = width.saturating_sub(target_width + margin);
    let y = height.saturating_sub(target_height + margin);

    image::imageops::overlay(canvas, &scaled, i64::from(x), i64::from(y));
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, pixel);
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn wide_source_fills_the_canvas_without_letterboxing() {
        let solid = png_bytes(200, 50, Rgba([10, 200, 30, 255]));
        let canvas = compose_square(&solid, 64, None).unwrap();

        assert_eq!(canvas.dimensions(), (64, 64));
        // A letterboxed result would have blank bands; fill-and-crop keeps
        // every pixel from the (solid) source.
        for pixel in canvas.pixels() {
            assert_eq!(pixel[3], 255);
            assert!(pixel[1] > 100, "expected source color, got {pixel:?}");
        }
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = compose_square(b"not an image", 64, None).unwrap_err();
        assert!(matches!(err, MediaError::Decode { .. }));
    }

    #[test]
    fn watermark_lands_bottom_right() {
        let mut canvas = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let mark = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));

        overlay_watermark(&mut canvas, &mark);

        // 20% width => 20px mark, margin max(10, 4) = 10 => region x,y in [70, 90).
        assert_eq!(canvas.get_pixel(75, 75)[0], 255);
        // Opposite corner untouched.
        assert_eq!(canvas.get_pixel(5, 5)[0], 0);
        // Outside the margin stays clear.
        assert_eq!(canvas.get_pixel(95, 95)[0], 0);
    }
}
