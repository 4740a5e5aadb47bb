//! QR code rendering for share links: fixed 300px, two quiet modules of
//! margin, black on white, delivered as a PNG data URL so the client can
//! drop it straight into an image element.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::QrCode;

use crate::{MediaError, MediaResult};

/// Output edge in pixels
pub const QR_SIZE: u32 = 300;

/// Quiet-zone margin in modules
const QR_MARGIN_MODULES: u32 = 2;

/// Render `url` into a QR PNG data URL
pub fn render_qr_data_url(url: &str) -> MediaResult<String> {
    let png = render_qr_png(url)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}

/// Render `url` into a 300x300 QR PNG
pub fn render_qr_png(url: &str) -> MediaResult<Vec<u8>> {
    let code = QrCode::new(url.as_bytes()).map_err(|e| MediaError::qr(e.to_string()))?;
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let total_modules = modules + QR_MARGIN_MODULES * 2;
    let scale = (QR_SIZE / total_modules).max(1);
    let dim = total_modules * scale;

    let mut canvas = GrayImage::from_pixel(dim, dim, Luma([0xFF]));
    for module_y in 0..modules {
        for module_x in 0..modules {
            if colors[(module_y * modules + module_x) as usize] == qrcode::Color::Dark {
                let base_x = (module_x + QR_MARGIN_MODULES) * scale;
                let base_y = (module_y + QR_MARGIN_MODULES) * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        canvas.put_pixel(base_x + dx, base_y + dy, Luma([0x00]));
                    }
                }
            }
        }
    }

    // Snap to the fixed output size; nearest keeps modules crisp.
    let canvas = if dim != QR_SIZE {
        image::imageops::resize(&canvas, QR_SIZE, QR_SIZE, FilterType::Nearest)
    } else {
        canvas
    };

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(canvas)
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| MediaError::qr(e.to_string()))?;
    Ok(out.into_inner())
}
