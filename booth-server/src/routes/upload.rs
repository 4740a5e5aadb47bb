use axum::extract::{Multipart, State};
use axum::Json;
use booth_storage::{ArtifactKind, UploadRequest};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/upload` - store a captured artifact across the enabled
/// backends and hand back share URLs plus a QR code.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    info!("upload request received");

    let mut file: Option<(String, Bytes)> = None;
    let mut requested_name: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::bad_request)?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or("upload.jpg").to_string();
                let bytes = field.bytes().await.map_err(ApiError::bad_request)?;
                file = Some((original_name, bytes));
            }
            Some("name") => {
                let text = field.text().await.map_err(ApiError::bad_request)?;
                if !text.trim().is_empty() {
                    requested_name = Some(text.trim().to_string());
                }
            }
            _ => {}
        }
    }
    let Some((original_name, bytes)) = file else {
        warn!("no file in upload request");
        return Err(ApiError::bad_request(anyhow::anyhow!("No file uploaded")));
    };
    info!(name = %original_name, size = bytes.len(), "file received");

    let extension = original_name
        .rsplit('.')
        .next()
        .filter(|ext| *ext != original_name)
        .unwrap_or("jpg")
        .to_ascii_lowercase();
    // Caller-provided names are reduced to their final path component.
    let filename = requested_name
        .and_then(|name| {
            name.rsplit(['/', '\\'])
                .next()
                .map(str::to_string)
                .filter(|n| !n.is_empty())
        })
        .unwrap_or_else(|| {
            format!("DigiOH_PhotoBox_{}.{extension}", Utc::now().timestamp_millis())
        });
    let kind = ArtifactKind::from_filename(&filename);

    let dir = state.upload_dir.join(kind.subdir());
    tokio::fs::create_dir_all(&dir).await.map_err(ApiError::internal)?;
    let local_path = dir.join(&filename);
    tokio::fs::write(&local_path, &bytes)
        .await
        .map_err(ApiError::internal)?;
    info!(path = %local_path.display(), "file saved locally");

    match state
        .orchestrator
        .upload(UploadRequest::new(&local_path, filename.clone()))
        .await
    {
        Ok(outcome) => {
            let mut body = serde_json::to_value(&outcome).map_err(ApiError::internal)?;
            body["success"] = json!(true);
            Ok(Json(body))
        }
        // The file is already on disk and served under /uploads, so a
        // storage failure still yields a usable local result.
        Err(e) => {
            error!(error = %e, "storage orchestration failed, using local fallback");
            Ok(Json(local_fallback(&state, &filename, kind)))
        }
    }
}

fn local_fallback(state: &AppState, filename: &str, kind: ArtifactKind) -> Value {
    let web_path = format!("uploads/{}/{filename}", kind.subdir());
    let direct_link = if state.public_base_url.is_empty() {
        format!("/{web_path}")
    } else {
        format!("{}/{web_path}", state.public_base_url)
    };
    let qr_code = booth_media::render_qr_data_url(&direct_link).ok();

    json!({
        "success": true,
        "downloadUrl": format!("/{web_path}"),
        "viewUrl": format!("/{web_path}"),
        "directLink": direct_link,
        "qrCode": qr_code,
        "filename": filename,
        "storageProvider": "local-fallback",
        "storageResults": [{
            "provider": "local-fallback",
            "downloadUrl": format!("/{web_path}"),
            "viewUrl": format!("/{web_path}"),
        }],
    })
}
