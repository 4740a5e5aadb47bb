//! Fan-out upload coordination across the enabled storage backends.
//!
//! Every enabled backend gets the artifact; failures are collected
//! rather than short-circuiting, and the local backend acts as a
//! fallback so an upload never succeeds with zero stored copies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use booth_media::Watermarker;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{ArtifactKind, BackendUpload, StorageBackend};
use crate::config::{SharedConfig, StorageSettings};
use crate::error::{StorageError, StorageResult};

/// One artifact to be stored across the enabled backends.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Where the server saved the incoming file.
    pub local_path: PathBuf,
    /// Name the artifact is stored under everywhere.
    pub filename: String,
    pub kind: ArtifactKind,
}

impl UploadRequest {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(local_path: P, filename: S) -> Self {
        let filename = filename.into();
        let kind = ArtifactKind::from_filename(&filename);
        Self {
            local_path: local_path.into(),
            filename,
            kind,
        }
    }
}

/// Where one backend put the artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageOutcome {
    pub provider: String,
    pub download_url: String,
    pub view_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
}

impl StorageOutcome {
    fn from_upload(provider: &str, upload: BackendUpload) -> Self {
        let download_url = upload
            .download_url
            .unwrap_or_else(|| upload.public_url.clone());
        let view_url = upload.view_url.unwrap_or_else(|| upload.public_url.clone());
        Self {
            provider: provider.to_string(),
            download_url,
            view_url,
            remote_path: upload.remote_path,
        }
    }
}

/// Aggregate result of one orchestrated upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    /// Backend whose URLs the visitor gets.
    #[serde(rename = "storageProvider")]
    pub provider: String,
    pub download_url: String,
    pub view_url: String,
    pub direct_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    pub filename: String,
    #[serde(rename = "storageResults")]
    pub results: Vec<StorageOutcome>,
    #[serde(rename = "storageErrors", skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Coordinates one upload across every enabled backend.
///
/// Backends are held behind the [`StorageBackend`] trait so tests can
/// substitute fakes. The settings snapshot at the start of each call
/// decides which backends participate and which one is primary.
pub struct UploadOrchestrator {
    settings: SharedConfig<StorageSettings>,
    local: Arc<dyn StorageBackend>,
    ftp: Arc<dyn StorageBackend>,
    nextcloud: Arc<dyn StorageBackend>,
    gdrive: Arc<dyn StorageBackend>,
    watermark: Arc<Watermarker>,
}

impl UploadOrchestrator {
    pub fn new(
        settings: SharedConfig<StorageSettings>,
        local: Arc<dyn StorageBackend>,
        ftp: Arc<dyn StorageBackend>,
        nextcloud: Arc<dyn StorageBackend>,
        gdrive: Arc<dyn StorageBackend>,
        watermark: Arc<Watermarker>,
    ) -> Self {
        Self {
            settings,
            local,
            ftp,
            nextcloud,
            gdrive,
            watermark,
        }
    }

    pub fn settings(&self) -> &SharedConfig<StorageSettings> {
        &self.settings
    }

    /// Backends the current settings enable, remotes first so the
    /// primary lookup prefers them when the provider name is remote.
    fn enabled_backends(&self, settings: &StorageSettings) -> Vec<Arc<dyn StorageBackend>> {
        let mut backends: Vec<Arc<dyn StorageBackend>> = Vec::new();
        if settings.enable_ftp {
            backends.push(Arc::clone(&self.ftp));
        }
        if settings.enable_nextcloud {
            backends.push(Arc::clone(&self.nextcloud));
        }
        if settings.enable_gdrive {
            backends.push(Arc::clone(&self.gdrive));
        }
        if settings.enable_local {
            backends.push(Arc::clone(&self.local));
        }
        backends
    }

    /// Produce a watermarked sibling copy for remote image uploads.
    /// Any failure degrades to the original file.
    async fn watermarked_copy(&self, request: &UploadRequest) -> Option<PathBuf> {
        if request.kind.is_gif() || !self.watermark.is_enabled() {
            return None;
        }
        let bytes = match tokio::fs::read(&request.local_path).await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "could not read upload for watermarking");
                return None;
            }
        };
        let marked = self.watermark.apply(&bytes);
        let path = request
            .local_path
            .with_file_name(format!("wm-{}", request.filename));
        match tokio::fs::write(&path, marked).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(error = %e, "could not write watermarked copy");
                None
            }
        }
    }

    /// Upload to every enabled backend and assemble the aggregate
    /// outcome. Returns an error only when not even the local backend
    /// could store the artifact.
    pub async fn upload(&self, request: UploadRequest) -> StorageResult<UploadOutcome> {
        let settings = self.settings.snapshot().await;
        let backends = self.enabled_backends(&settings);

        let watermarked = self.watermarked_copy(&request).await;
        let remote_source = watermarked.as_deref().unwrap_or(&request.local_path);

        let attempts = backends.iter().map(|backend| {
            let source: &Path = if backend.name() == "local" {
                &request.local_path
            } else {
                remote_source
            };
            let name = backend.name();
            let upload = backend.upload(source, &request.filename, request.kind);
            async move { (name, upload.await) }
        });
        let settled = join_all(attempts).await;

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for (name, outcome) in settled {
            match outcome {
                Ok(upload) => {
                    debug!(backend = name, url = %upload.public_url, "backend upload ok");
                    results.push(StorageOutcome::from_upload(name, upload));
                }
                Err(e) => {
                    warn!(backend = name, error = %e, "backend upload failed");
                    errors.push(format!("{name}: {e}"));
                }
            }
        }

        // Never finish with zero copies: fall back to local storage
        // even when the settings left it disabled.
        if results.is_empty() {
            match self
                .local
                .upload(&request.local_path, &request.filename, request.kind)
                .await
            {
                Ok(upload) => {
                    info!("falling back to local storage");
                    results.push(StorageOutcome::from_upload(self.local.name(), upload));
                }
                Err(e) => {
                    errors.push(format!("{}: {e}", self.local.name()));
                    self.cleanup(&request, &watermarked, false, &settings).await;
                    return Err(StorageError::backend(UploadFailed { errors }));
                }
            }
        }

        let primary = results
            .iter()
            .find(|r| r.provider == settings.provider)
            .unwrap_or(&results[0])
            .clone();

        let qr_code = match booth_media::render_qr_data_url(&primary.download_url) {
            Ok(data_url) => Some(data_url),
            Err(e) => {
                warn!(error = %e, "qr code generation failed");
                None
            }
        };

        let remote_succeeded = results.iter().any(|r| r.provider != "local");
        self.cleanup(&request, &watermarked, remote_succeeded, &settings)
            .await;

        Ok(UploadOutcome {
            provider: primary.provider.clone(),
            download_url: primary.download_url.clone(),
            view_url: primary.view_url.clone(),
            direct_link: primary.download_url,
            qr_code,
            filename: request.filename,
            results,
            errors,
        })
    }

    /// Remove the watermarked scratch copy, and the original upload
    /// once a remote backend holds it (unless configured to keep it).
    async fn cleanup(
        &self,
        request: &UploadRequest,
        watermarked: &Option<PathBuf>,
        remote_succeeded: bool,
        settings: &StorageSettings,
    ) {
        if let Some(path) = watermarked {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(error = %e, "could not remove watermarked copy");
            }
        }
        if remote_succeeded && !settings.keep_local && !settings.enable_local {
            if let Err(e) = tokio::fs::remove_file(&request.local_path).await {
                warn!(error = %e, "could not remove local upload");
            }
        }
    }
}

/// Every backend, including the local fallback, failed.
#[derive(Debug)]
struct UploadFailed {
    errors: Vec<String>,
}

impl std::fmt::Display for UploadFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "all storage backends failed: {}", self.errors.join("; "))
    }
}

impl std::error::Error for UploadFailed {}
