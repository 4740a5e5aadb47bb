use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StorageResult;

/// Kind of artifact being stored. Backends keep images and animations
/// in separate subdirectories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Gif,
}

impl ArtifactKind {
    /// Subdirectory name used by every backend for this kind.
    pub fn subdir(&self) -> &'static str {
        match self {
            Self::Image => "img",
            Self::Gif => "gif",
        }
    }

    pub fn is_gif(&self) -> bool {
        matches!(self, Self::Gif)
    }

    /// Classify by file extension. Anything that is not a gif counts
    /// as an image.
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".gif") {
            Self::Gif
        } else {
            Self::Image
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.subdir())
    }
}

/// What a backend hands back after a successful upload.
#[derive(Debug, Clone)]
pub struct BackendUpload {
    /// URL to present to the visitor (share page or direct file).
    pub public_url: String,
    /// Direct-download URL when the backend distinguishes it.
    pub download_url: Option<String>,
    /// Browser view URL when the backend distinguishes it.
    pub view_url: Option<String>,
    /// Path of the file on the remote system, when meaningful.
    pub remote_path: Option<String>,
}

impl BackendUpload {
    /// Upload result where one URL serves every purpose.
    pub fn single_url<S: Into<String>>(url: S) -> Self {
        let url = url.into();
        Self {
            public_url: url,
            download_url: None,
            view_url: None,
            remote_path: None,
        }
    }
}

/// Result of probing a backend's connectivity and credentials.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
}

impl ConnectionTest {
    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// A destination that can persist captured artifacts.
///
/// Implementations upload a local file under a remote name and return
/// the URLs a visitor can use to retrieve it. The orchestrator fans an
/// upload out across every enabled backend.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short identifier used in results and logs ("local", "ftp", ...).
    fn name(&self) -> &'static str;

    /// Upload the file at `local_path` under `remote_name`.
    async fn upload(
        &self,
        local_path: &Path,
        remote_name: &str,
        kind: ArtifactKind,
    ) -> StorageResult<BackendUpload>;

    /// Probe connectivity with the current configuration.
    async fn test_connection(&self) -> ConnectionTest;
}
