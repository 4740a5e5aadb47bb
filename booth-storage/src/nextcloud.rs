use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::backend::{ArtifactKind, BackendUpload, ConnectionTest, StorageBackend};
use crate::config::{NextcloudConfig, SharedConfig};
use crate::error::{StorageError, StorageResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Uploads artifacts to Nextcloud over WebDAV and publishes them with
/// a public OCS share link.
///
/// An upload is only considered successful once the share link exists;
/// a file sitting in a private folder is useless to the visitor.
pub struct NextcloudBackend {
    config: SharedConfig<NextcloudConfig>,
    client: Client,
}

#[derive(Deserialize)]
struct OcsEnvelope {
    ocs: OcsBody,
}

#[derive(Deserialize)]
struct OcsBody {
    data: OcsShare,
}

#[derive(Deserialize)]
struct OcsShare {
    url: Option<String>,
}

impl NextcloudBackend {
    pub fn new(config: SharedConfig<NextcloudConfig>) -> StorageResult<Self> {
        Ok(Self {
            config,
            client: Client::builder().timeout(HTTP_TIMEOUT).build()?,
        })
    }

    /// Create each folder segment with MKCOL. 405 means the collection
    /// already exists and is not an error.
    async fn ensure_folders(&self, cfg: &NextcloudConfig, folder: &str) -> StorageResult<()> {
        let mut path = cfg.dav_root();
        for segment in folder.split('/').filter(|s| !s.is_empty()) {
            path = format!("{path}/{segment}");
            let response = self
                .client
                .request(Method::from_bytes(b"MKCOL").expect("valid method"), &path)
                .basic_auth(&cfg.username, Some(&cfg.password))
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() && status != StatusCode::METHOD_NOT_ALLOWED {
                return Err(StorageError::share(format!(
                    "MKCOL {path} returned {status}"
                )));
            }
        }
        Ok(())
    }

    /// Create a public read-only share for `remote_path` and return its URL.
    async fn create_share(
        &self,
        cfg: &NextcloudConfig,
        remote_path: &str,
    ) -> StorageResult<String> {
        let endpoint = format!(
            "{}/ocs/v2.php/apps/files_sharing/api/v1/shares",
            cfg.server_url
        );
        let mut form = vec![
            ("path", remote_path.to_string()),
            ("shareType", "3".to_string()),
            ("permissions", "1".to_string()),
        ];
        if !cfg.share_password.is_empty() {
            form.push(("password", cfg.share_password.clone()));
        }
        if cfg.share_expiry_days > 0 {
            let expiry = Utc::now().date_naive() + chrono::Days::new(cfg.share_expiry_days.into());
            form.push(("expireDate", expiry.format("%Y-%m-%d").to_string()));
        }
        let response = self
            .client
            .post(&endpoint)
            .basic_auth(&cfg.username, Some(&cfg.password))
            .header("OCS-APIRequest", "true")
            .query(&[("format", "json")])
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::share(format!(
                "share request returned {status}"
            )));
        }
        let envelope: OcsEnvelope = response.json().await?;
        envelope
            .ocs
            .data
            .url
            .ok_or_else(|| StorageError::share("share response carried no url"))
    }
}

#[async_trait]
impl StorageBackend for NextcloudBackend {
    fn name(&self) -> &'static str {
        "nextcloud"
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
                "Nextcloud server, user, or password missing",
            ));
        }

        let folder = format!("{}/{}", cfg.folder.trim_end_matches('/'), kind.subdir());
        self.ensure_folders(&cfg, &folder).await?;

        let remote_path = format!("{folder}/{remote_name}");
        let bytes = tokio::fs::read(local_path).await?;
        let put_url = format!("{}{remote_path}", cfg.dav_root());
        let response = self
            .client
            .put(&put_url)
            .basic_auth(&cfg.username, Some(&cfg.password))
            .body(bytes)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::share(format!("PUT {put_url} returned {status}")));
        }
        debug!(path = %remote_path, "uploaded to nextcloud");

        let share_url = self.create_share(&cfg, &remote_path).await?;
        let download_url = format!("{share_url}/download");
        Ok(BackendUpload {
            public_url: download_url.clone(),
            download_url: Some(download_url),
            view_url: Some(share_url),
            remote_path: Some(remote_path),
        })
    }

    async fn test_connection(&self) -> ConnectionTest {
        let cfg = self.config.snapshot().await;
        if !cfg.is_configured() {
            return ConnectionTest::failed("Nextcloud server, user, or password missing");
        }
        let probe = self
            .client
            .request(
                Method::from_bytes(b"PROPFIND").expect("valid method"),
                cfg.dav_root(),
            )
            .basic_auth(&cfg.username, Some(&cfg.password))
            .header("Depth", "0")
            .send()
            .await;
        match probe {
            Ok(r) if r.status().is_success() || r.status() == StatusCode::MULTI_STATUS => {
                ConnectionTest::ok(format!("Connected to {}", cfg.server_url))
            }
            Ok(r) => ConnectionTest::failed(format!("WebDAV probe returned {}", r.status())),
            Err(e) => {
                warn!(error = %e, "nextcloud probe failed");
                ConnectionTest::failed(format!("Connection failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_upload_is_rejected() {
        let backend = NextcloudBackend::new(SharedConfig::new(NextcloudConfig::default())).unwrap();
        let err = backend
            .upload(Path::new("/nonexistent"), "x.jpg", ArtifactKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured { .. }));
    }

    #[test]
    fn share_envelope_parses() {
        let json = r#"{"ocs":{"data":{"url":"https://cloud.example.com/s/AbCd"}}}"#;
        let envelope: OcsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(
            envelope.ocs.data.url.as_deref(),
            Some("https://cloud.example.com/s/AbCd")
        );
    }
}
