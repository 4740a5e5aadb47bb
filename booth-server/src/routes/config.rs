use axum::extract::State;
use axum::Json;
use booth_storage::{
    ConnectionTest, FtpBackend, FtpConfig, FtpConfigUpdate, NextcloudBackend, NextcloudConfig,
    NextcloudConfigUpdate, SharedConfig, StorageBackend,
};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/ftp/config` - current FTP settings with the password masked.
pub async fn get_ftp_config(State(state): State<AppState>) -> Json<FtpConfig> {
    Json(state.ftp.snapshot().await.sanitized())
}

/// `POST /api/ftp/config` - merge a partial update into the live config.
pub async fn set_ftp_config(
    State(state): State<AppState>,
    Json(update): Json<FtpConfigUpdate>,
) -> Json<FtpConfig> {
    let merged = state.ftp.snapshot().await.merged(update);
    info!(host = %merged.host, "ftp config updated");
    state.ftp.replace(merged.clone()).await;
    Json(merged.sanitized())
}

/// `POST /api/ftp/test` - probe with request overrides merged over the
/// current snapshot. The merged config is never persisted.
pub async fn test_ftp(
    State(state): State<AppState>,
    Json(update): Json<FtpConfigUpdate>,
) -> Json<ConnectionTest> {
    let merged = state.ftp.snapshot().await.merged(update);
    let backend = FtpBackend::new(SharedConfig::new(merged));
    Json(backend.test_connection().await)
}

/// `GET /api/nextcloud/config`
pub async fn get_nextcloud_config(State(state): State<AppState>) -> Json<NextcloudConfig> {
    Json(state.nextcloud.snapshot().await.sanitized())
}

/// `POST /api/nextcloud/config`
pub async fn set_nextcloud_config(
    State(state): State<AppState>,
    Json(update): Json<NextcloudConfigUpdate>,
) -> Json<NextcloudConfig> {
    let merged = state.nextcloud.snapshot().await.merged(update);
    info!(server = %merged.server_url, "nextcloud config updated");
    state.nextcloud.replace(merged.clone()).await;
    Json(merged.sanitized())
}

/// `POST /api/nextcloud/test`
pub async fn test_nextcloud(
    State(state): State<AppState>,
    Json(update): Json<NextcloudConfigUpdate>,
) -> Result<Json<ConnectionTest>, ApiError> {
    let merged = state.nextcloud.snapshot().await.merged(update);
    let backend = NextcloudBackend::new(SharedConfig::new(merged))?;
    Ok(Json(backend.test_connection().await))
}
