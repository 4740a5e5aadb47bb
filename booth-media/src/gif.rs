//! Two-frame before/after GIF assembly.
//!
//! Each frame is composed onto the square canvas, palette-quantized to 256
//! colors with NeuQuant, and appended with its display delay. The animation
//! is exactly two frames: the captured original, then the stylized result.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use booth_core::{BoothError, BoothResult, GifBuilder};
use bytes::Bytes;
use image::RgbaImage;

use crate::watermark::Watermarker;
use crate::{MediaError, MediaResult};

/// Square canvas edge for both GIF frames
pub const GIF_FRAME_SIZE: u32 = 512;

/// Display delays in milliseconds: original briefly, stylized longer
pub const FRAME_DELAYS_MS: [u16; 2] = [333, 833];

/// NeuQuant sample factor; 10 matches the quality/speed point the encoder
/// in the image stack uses for GIF output.
const NEUQUANT_SAMPLE_FAC: i32 = 10;

#[derive(Clone)]
pub struct GifAssembler {
    frame_size: u32,
    watermark: Arc<Watermarker>,
}

impl GifAssembler {
    pub fn new(watermark: Arc<Watermarker>) -> Self {
        Self {
            frame_size: GIF_FRAME_SIZE,
            watermark,
        }
    }

    pub fn with_frame_size(mut self, size: u32) -> Self {
        self.frame_size = size;
        self
    }

    /// Encode the two-frame GIF. Either source failing to decode aborts the
    /// whole assembly; callers treat "no GIF" as retryable, not fatal.
    pub fn encode(&self, input: &[u8], output: &[u8]) -> MediaResult<Vec<u8>> {
        let size = self.frame_size;
        let mut buffer = Vec::new();

        {
            let mut encoder = gif::Encoder::new(&mut buffer, size as u16, size as u16, &[])
                .map_err(|e| MediaError::encode(e.to_string()))?;
            encoder
                .set_repeat(gif::Repeat::Infinite)
                .map_err(|e| MediaError::encode(e.to_string()))?;

            for (bytes, delay_ms) in [(input, FRAME_DELAYS_MS[0]), (output, FRAME_DELAYS_MS[1])] {
                let canvas = crate::frame::compose_square(bytes, size, self.watermark.overlay())?;
                let frame = quantized_frame(&canvas, delay_ms);
                encoder
                    .write_frame(&frame)
                    .map_err(|e| MediaError::encode(e.to_string()))?;
            }
        }

        Ok(buffer)
    }
}

/// Quantize one composed canvas to a 256-color palette and wrap it as a GIF
/// frame with the given display delay.
fn quantized_frame(canvas: &RgbaImage, delay_ms: u16) -> gif::Frame<'static> {
    let pixels = canvas.as_raw();
    let quantizer = color_quant::NeuQuant::new(NEUQUANT_SAMPLE_FAC, 256, pixels);
    let indexed: Vec<u8> = canvas
        .pixels()
        .map(|p| quantizer.index_of(&p.0) as u8)
        .collect();

    let mut frame = gif::Frame::default();
    frame.width = canvas.width() as u16;
    frame.height = canvas.height() as u16;
    frame.buffer = Cow::Owned(indexed);
    frame.palette = Some(quantizer.color_map_rgb());
    // GIF delays count in 10ms units.
    frame.delay = delay_ms / 10;
    frame
}

#[async_trait]
impl GifBuilder for GifAssembler {
    async fn assemble(&self, input: Bytes, output: Bytes) -> BoothResult<Bytes> {
        let assembler = self.clone();
        // Quantization is CPU-bound; keep it off the async workers.
        let encoded = tokio::task::spawn_blocking(move || assembler.encode(&input, &output))
            .await
            .map_err(|e| BoothError::gif_assembly(e.to_string()))?
            .map_err(|e| BoothError::gif_assembly(e.to_string()))?;
        Ok(Bytes::from(encoded))
    }
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

    fn decode_frames(data: &[u8]) -> Vec<u16> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(Cursor::new(data)).unwrap();
        let mut delays = Vec::new();
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            delays.push(frame.delay);
        }
        delays
    }

    #[test]
    fn assembles_two_frames_with_expected_delays() {
        let assembler =
            GifAssembler::new(Arc::new(Watermarker::disabled())).with_frame_size(64);
        let before = png_bytes(64, 64, Rgba([200, 40, 40, 255]));
        let after = png_bytes(64, 64, Rgba([40, 40, 200, 255]));

        let encoded = assembler.encode(&before, &after).unwrap();
        assert_eq!(&encoded[..6], b"GIF89a");

        let delays = decode_frames(&encoded);
        assert_eq!(delays, vec![33, 83]);
    }

    #[test]
    fn identical_inputs_yield_structurally_equal_gifs() {
        let assembler =
            GifAssembler::new(Arc::new(Watermarker::disabled())).with_frame_size(32);
        let before = png_bytes(40, 20, Rgba([10, 120, 10, 255]));
        let after = png_bytes(20, 40, Rgba([120, 10, 10, 255]));

        let first = assembler.encode(&before, &after).unwrap();
        let second = assembler.encode(&before, &after).unwrap();

        assert_eq!(decode_frames(&first), decode_frames(&second));
        assert_eq!(first, second);
    }

    #[test]
    fn undecodable_source_aborts_assembly() {
        let assembler = GifAssembler::new(Arc::new(Watermarker::disabled()));
        let valid = png_bytes(16, 16, Rgba([0, 0, 0, 255]));

        assert!(assembler.encode(b"garbage", &valid).is_err());
        assert!(assembler.encode(&valid, b"garbage").is_err());
    }

    #[tokio::test]
    async fn builder_seam_returns_encoded_bytes() {
        let assembler =
            GifAssembler::new(Arc::new(Watermarker::disabled())).with_frame_size(32);
        let before = Bytes::from(png_bytes(32, 32, Rgba([1, 2, 3, 255])));
        let after = Bytes::from(png_bytes(32, 32, Rgba([3, 2, 1, 255])));

        let encoded = GifBuilder::assemble(&assembler, before, after).await.unwrap();
        assert_eq!(&encoded[..6], b"GIF89a");
    }
}
