use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /health` - liveness plus a secrets-free view of which storage
/// backends are enabled and configured.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let settings = state.settings.snapshot().await;
    let ftp = state.ftp.snapshot().await;
    let nextcloud = state.nextcloud.snapshot().await;
    let gdrive = state.gdrive.snapshot().await;

    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "storageProvider": settings.provider,
        "backends": {
            "local": { "enabled": settings.enable_local, "configured": true },
            "ftp": { "enabled": settings.enable_ftp, "configured": ftp.is_configured() },
            "nextcloud": {
                "enabled": settings.enable_nextcloud,
                "configured": nextcloud.is_configured(),
            },
            "gdrive": { "enabled": settings.enable_gdrive, "configured": gdrive.is_configured() },
        },
    }))
}
