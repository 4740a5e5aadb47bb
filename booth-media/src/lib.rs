//! # booth-media: pixel work for the event photobooth
//!
//! Three concerns live here:
//!
//! - [`GifAssembler`]: composites the captured and stylized frames onto a
//!   fixed square canvas (scale to fill, crop overflow - never letterbox),
//!   quantizes each to a 256-color palette, and encodes the two-frame
//!   before/after GIF with display delays of 333ms and 833ms.
//! - [`Watermarker`]: bottom-right logo overlay shared by the GIF frames
//!   and the remote-upload path. Watermark trouble always degrades to the
//!   unmarked original rather than failing the operation.
//! - [`qr`]: renders a share URL into a fixed 300px black-on-white PNG
//!   served as a data URL.

pub mod frame;
pub mod gif;
pub mod qr;
pub mod watermark;

mod error;

pub use error::{MediaError, MediaResult};
pub use frame::compose_square;
pub use gif::{GifAssembler, FRAME_DELAYS_MS, GIF_FRAME_SIZE};
pub use qr::{render_qr_data_url, render_qr_png, QR_SIZE};
pub use watermark::Watermarker;
