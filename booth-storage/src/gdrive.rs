use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::backend::{ArtifactKind, BackendUpload, ConnectionTest, StorageBackend};
use crate::config::{GoogleDriveConfig, SharedConfig};
use crate::error::{StorageError, StorageResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const UPLOAD_ENDPOINT: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FILES_ENDPOINT: &str = "https://www.googleapis.com/drive/v3/files";

/// Access tokens expire after an hour; refresh a minute early.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Uploads artifacts to Google Drive with a service account.
///
/// Authentication is the signed-JWT grant: the service account's RSA
/// key signs a short-lived assertion which the token endpoint trades
/// for an access token. Tokens are cached per identity until shortly
/// before expiry.
pub struct GoogleDriveBackend {
    config: SharedConfig<GoogleDriveConfig>,
    client: Client,
    tokens: Mutex<HashMap<String, CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

#[derive(Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    web_view_link: Option<String>,
    web_content_link: Option<String>,
}

fn mime_type_for(remote_name: &str, kind: ArtifactKind) -> &'static str {
    if kind.is_gif() {
        return "image/gif";
    }
    let lower = remote_name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

impl GoogleDriveBackend {
    pub fn new(config: SharedConfig<GoogleDriveConfig>) -> StorageResult<Self> {
        Ok(Self {
            config,
            client: Client::builder().timeout(HTTP_TIMEOUT).build()?,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    /// Fetch or reuse an access token for the configured identity.
    async fn access_token(&self, cfg: &GoogleDriveConfig) -> StorageResult<String> {
        let cache_key = format!("{}:{}", cfg.client_email, cfg.impersonated_user);
        let now = Utc::now().timestamp();
        {
            let cache = self.tokens.lock().await;
            if let Some(cached) = cache.get(&cache_key) {
                if cached.expires_at - TOKEN_EXPIRY_MARGIN_SECS > now {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let claims = JwtClaims {
            iss: cfg.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: TOKEN_ENDPOINT.to_string(),
            iat: now,
            exp: now + 3600,
            sub: (!cfg.impersonated_user.is_empty()).then(|| cfg.impersonated_user.clone()),
        };
        let key = EncodingKey::from_rsa_pem(cfg.private_key.as_bytes())
            .map_err(StorageError::backend)?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(StorageError::backend)?;

        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::share(format!(
                "token exchange returned {status}: {body}"
            )));
        }
        let token: TokenResponse = response.json().await?;

        let mut cache = self.tokens.lock().await;
        cache.insert(
            cache_key,
            CachedToken {
                access_token: token.access_token.clone(),
                expires_at: now + token.expires_in,
            },
        );
        Ok(token.access_token)
    }

    /// Upload file content plus metadata in one multipart/related request.
    async fn upload_multipart(
        &self,
        token: &str,
        cfg: &GoogleDriveConfig,
        bytes: Vec<u8>,
        remote_name: &str,
        kind: ArtifactKind,
    ) -> StorageResult<DriveFile> {
        let mut metadata = json!({
            "name": remote_name,
            "mimeType": mime_type_for(remote_name, kind),
        });
        let parent = if kind.is_gif() && !cfg.gif_folder_id.is_empty() {
            &cfg.gif_folder_id
        } else {
            &cfg.folder_id
        };
        if !parent.is_empty() {
            metadata["parents"] = json!([parent]);
        }

        let boundary = format!("booth-{}", uuid::Uuid::new_v4().simple());
        let mut body = Vec::with_capacity(bytes.len() + 512);
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata.to_string().as_bytes());
        body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Type: {}\r\n\r\n", mime_type_for(remote_name, kind)).as_bytes(),
        );
        body.extend_from_slice(&bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let response = self
            .client
            .post(UPLOAD_ENDPOINT)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id,webViewLink,webContentLink"),
                ("supportsAllDrives", "true"),
            ])
            .bearer_auth(token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::share(format!(
                "drive upload returned {status}: {body}"
            )));
        }
        Ok(response.json().await?)
    }

    /// Make the file readable by anyone with the link. Failure is
    /// logged but does not fail the upload; the file itself is stored.
    async fn share_with_anyone(&self, token: &str, file_id: &str) {
        let result = self
            .client
            .post(format!("{FILES_ENDPOINT}/{file_id}/permissions"))
            .query(&[("supportsAllDrives", "true")])
            .bearer_auth(token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await;
        match result {
            Ok(r) if r.status().is_success() => {}
            Ok(r) => warn!(status = %r.status(), "drive permission grant failed"),
            Err(e) => warn!(error = %e, "drive permission request failed"),
        }
    }
}

#[async_trait]
impl StorageBackend for GoogleDriveBackend {
    fn name(&self) -> &'static str {
        "gdrive"
    }

    async fn upload(
        &self,
        local_path: &Path,
        remote_name: &str,
        kind: ArtifactKind,
    ) -> StorageResult<BackendUpload> {
        let cfg = self.config.snapshot().await;
        if !cfg.is_configured() {
            return Err(StorageError::not_configured(
                "Google Drive client email or private key missing",
            ));
        }

        let token = self.access_token(&cfg).await?;
        let bytes = tokio::fs::read(local_path).await?;
        let file = self
            .upload_multipart(&token, &cfg, bytes, remote_name, kind)
            .await?;
        debug!(file_id = %file.id, "uploaded to google drive");

        self.share_with_anyone(&token, &file.id).await;

        let view_url = file
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", file.id));
        let download_url = file
            .web_content_link
            .unwrap_or_else(|| {
                format!("https://drive.google.com/uc?export=download&id={}", file.id)
            });
        Ok(BackendUpload {
            public_url: download_url.clone(),
            download_url: Some(download_url),
            view_url: Some(view_url),
            remote_path: Some(file.id),
        })
    }

    async fn test_connection(&self) -> ConnectionTest {
        let cfg = self.config.snapshot().await;
        if !cfg.is_configured() {
            return ConnectionTest::failed("Google Drive client email or private key missing");
        }
        match self.access_token(&cfg).await {
            Ok(_) => ConnectionTest::ok(format!("Authenticated as {}", cfg.client_email)),
            Err(e) => ConnectionTest::failed(format!("Authentication failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types_follow_kind_and_extension() {
        assert_eq!(mime_type_for("a.gif", ArtifactKind::Gif), "image/gif");
        assert_eq!(mime_type_for("a.png", ArtifactKind::Image), "image/png");
        assert_eq!(mime_type_for("a.jpg", ArtifactKind::Image), "image/jpeg");
    }

    #[test]
    fn drive_file_parses_partial_links() {
        let json = r#"{"id":"abc123","webViewLink":"https://drive.google.com/file/d/abc123/view"}"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "abc123");
        assert!(file.web_view_link.is_some());
        assert!(file.web_content_link.is_none());
    }

    #[tokio::test]
    async fn unconfigured_upload_is_rejected() {
        let backend = GoogleDriveBackend::new(SharedConfig::new(GoogleDriveConfig::default())).unwrap();
        let err = backend
            .upload(Path::new("/nonexistent"), "x.jpg", ArtifactKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured { .. }));
    }
}
