//! # booth-core: session domain for the event photobooth
//!
//! This crate owns everything a single photobooth session needs that is not
//! storage or pixel work: the photo queue and its cached image payloads, the
//! capture geometry engine that normalizes arbitrary camera streams to the
//! 9/16 or 16/9 target, the stylization client seam to the external
//! generative-image service, and the [`SessionController`] that drives the
//! capture -> stylize -> GIF -> upload flow.
//!
//! ## Key properties
//!
//! - **Explicit session context**: state lives on a [`SessionContext`] that
//!   is passed to the coordinating functions; there is no process-wide
//!   singleton, so multiple sessions can coexist and tests stay isolated.
//! - **Logical cancellation**: monotonically increasing tokens on the
//!   context (a reset epoch plus a download-preparation token) are checked
//!   after every suspension point. Stale continuations discard their
//!   results instead of mutating shared state.
//! - **Resource lifecycle**: at most one GIF artifact is live per session;
//!   installing a new one (or resetting) releases the previous handle.

pub mod capture;
pub mod controller;
pub mod session;
pub mod share;
pub mod stylize;
pub mod types;

mod error;

pub use capture::{compute_capture_geometry, resolve_orientation, CaptureGeometry, Viewport};
pub use controller::{GifBuilder, ModeCatalog, SessionController};
pub use error::{BoothError, BoothResult};
pub use session::{PrepareStatus, QrCodes, SessionContext, SessionState, CUSTOM_MODE};
pub use share::{HttpShareGateway, PreparedShare, ShareGateway, ShareGatewayConfig};
pub use stylize::{HttpStylizer, Stylizer, StylizerConfig};
pub use types::{CameraStream, GifArtifact, Orientation, Photo, PhotoId};
