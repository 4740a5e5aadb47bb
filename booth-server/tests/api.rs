use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use booth_server::{router, AppState};
use booth_storage::{
    FtpConfig, GoogleDriveConfig, LocalConfig, NextcloudConfig, StorageSettings,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "booth-test-boundary";

fn test_state(upload_dir: &std::path::Path) -> AppState {
    AppState::new(
        StorageSettings::default(),
        LocalConfig {
            base_dir: upload_dir.display().to_string(),
            public_base_url: "/uploads".to_string(),
        },
        FtpConfig::default(),
        NextcloudConfig::default(),
        GoogleDriveConfig::default(),
        booth_media::Watermarker::disabled(),
        upload_dir.to_path_buf(),
        String::new(),
    )
    .expect("state builds")
}

fn multipart_file(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn upload_stores_locally_and_returns_share_payload() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(test_state(tmp.path()));

    let body = multipart_file("file", "capture.jpg", b"fake-jpeg-bytes");
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["storageProvider"], "local");
    let download = json["downloadUrl"].as_str().unwrap();
    assert!(download.starts_with("/uploads/img/DigiOH_PhotoBox_"));
    assert!(download.ends_with(".jpg"));
    assert!(json["qrCode"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
    assert_eq!(json["storageResults"].as_array().unwrap().len(), 1);

    // The artifact is actually on disk under img/.
    let stored: Vec<_> = std::fs::read_dir(tmp.path().join("img"))
        .unwrap()
        .collect();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn upload_honors_requested_filename() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(test_state(tmp.path()));

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"capture.jpg\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(b"fake-jpeg-bytes");
    body.extend_from_slice(format!("\r\n--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"name\"\r\n\r\n");
    body.extend_from_slice(b"myshot.jpg");
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["filename"], "myshot.jpg");
    assert_eq!(json["downloadUrl"], "/uploads/img/myshot.jpg");
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(test_state(tmp.path()));

    let body = multipart_file("avatar", "capture.jpg", b"bytes");
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "No file uploaded");
}

#[tokio::test]
async fn gif_uploads_land_in_gif_subdir() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(test_state(tmp.path()));

    let body = multipart_file("file", "anim.gif", b"GIF89a-ish");
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["downloadUrl"]
        .as_str()
        .unwrap()
        .starts_with("/uploads/gif/"));
}

#[tokio::test]
async fn health_reports_backend_status_without_secrets() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(test_state(tmp.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["storageProvider"], "local");
    assert_eq!(json["backends"]["local"]["enabled"], true);
    assert_eq!(json["backends"]["ftp"]["configured"], false);
    assert!(json["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn config_read_back_masks_password() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    let app = router(state);

    let update = serde_json::json!({
        "host": "ftp.example.com",
        "username": "booth",
        "password": "hunter2",
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/ftp/config")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(update.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let written = json_body(response).await;
    assert_eq!(written["password"], "********");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/ftp/config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["host"], "ftp.example.com");
    assert_eq!(json["password"], "********");
}
