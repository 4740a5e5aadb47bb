//! # booth-server: HTTP surface for the event photobooth
//!
//! Routes:
//! - `POST /api/upload` - multipart upload fanned out across the enabled
//!   storage backends, returning share URLs and a QR code.
//! - `GET/POST /api/{ftp,nextcloud}/config`, `POST /api/{ftp,nextcloud}/test`
//!   - live backend configuration with secrets masked on read-back.
//! - `GET /health` - liveness and backend status.
//! - `/uploads/...` - static serving of locally stored artifacts.

pub mod error;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Upload size cap, matching the multipart limit of the capture client.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the full application router over the given state.
pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.upload_dir.clone());
    Router::new()
        .route("/api/upload", post(routes::upload::upload))
        .route(
            "/api/ftp/config",
            get(routes::config::get_ftp_config).post(routes::config::set_ftp_config),
        )
        .route("/api/ftp/test", post(routes::config::test_ftp))
        .route(
            "/api/nextcloud/config",
            get(routes::config::get_nextcloud_config).post(routes::config::set_nextcloud_config),
        )
        .route("/api/nextcloud/test", post(routes::config::test_nextcloud))
        .route("/health", get(routes::health::health))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
