use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{ArtifactKind, BackendUpload, ConnectionTest, StorageBackend};
use crate::config::{LocalConfig, SharedConfig};
use crate::error::StorageResult;

/// Stores artifacts on the local filesystem under `img/` and `gif/`
/// subdirectories and serves them back through the static file route.
pub struct LocalBackend {
    config: SharedConfig<LocalConfig>,
}

impl LocalBackend {
    pub fn new(config: SharedConfig<LocalConfig>) -> Self {
        Self { config }
    }

    /// Destination path for a given name and kind under the current config.
    pub async fn destination(&self, remote_name: &str, kind: ArtifactKind) -> PathBuf {
        let cfg = self.config.snapshot().await;
        Path::new(&cfg.base_dir).join(kind.subdir()).join(remote_name)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn upload(
        &self,
        local_path: &Path,
        remote_name: &str,
        kind: ArtifactKind,
    ) -> StorageResult<BackendUpload> {
        let cfg = self.config.snapshot().await;
        let dir = Path::new(&cfg.base_dir).join(kind.subdir());
        tokio::fs::create_dir_all(&dir).await?;

        let dest = dir.join(remote_name);
        // The source may already be the destination when the server
        // saved the upload straight into the serving directory.
        if dest != local_path {
            tokio::fs::copy(local_path, &dest).await?;
        }
        debug!(path = %dest.display(), "stored artifact locally");

        let url = format!("{}/{}/{}", cfg.public_base_url, kind.subdir(), remote_name);
        Ok(BackendUpload {
            public_url: url.clone(),
            download_url: Some(url.clone()),
            view_url: Some(url),
            remote_path: Some(dest.display().to_string()),
        })
    }

    async fn test_connection(&self) -> ConnectionTest {
        let cfg = self.config.snapshot().await;
        match tokio::fs::create_dir_all(&cfg.base_dir).await {
            Ok(()) => ConnectionTest::ok(format!("Local directory {} is writable", cfg.base_dir)),
            Err(e) => ConnectionTest::failed(format!("Cannot create {}: {e}", cfg.base_dir)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_into_kind_subdir_and_builds_url() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("store");
        let src = tmp.path().join("photo.jpg");
        tokio::fs::write(&src, b"jpeg-bytes").await.unwrap();

        let backend = LocalBackend::new(SharedConfig::new(LocalConfig {
            base_dir: base.display().to_string(),
            public_base_url: "/uploads".to_string(),
        }));

        let result = backend
            .upload(&src, "photo.jpg", ArtifactKind::Image)
            .await
            .unwrap();
        assert_eq!(result.public_url, "/uploads/img/photo.jpg");
        let stored = tokio::fs::read(base.join("img").join("photo.jpg"))
            .await
            .unwrap();
        assert_eq!(stored, b"jpeg-bytes");
    }

    #[tokio::test]
    async fn gif_lands_in_gif_subdir() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("anim.gif");
        tokio::fs::write(&src, b"gif-bytes").await.unwrap();

        let backend = LocalBackend::new(SharedConfig::new(LocalConfig {
            base_dir: tmp.path().join("store").display().to_string(),
            public_base_url: "/uploads".to_string(),
        }));

        let result = backend
            .upload(&src, "anim.gif", ArtifactKind::Gif)
            .await
            .unwrap();
        assert_eq!(result.public_url, "/uploads/gif/anim.gif");
    }

    #[tokio::test]
    async fn upload_in_place_does_not_truncate() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("store");
        tokio::fs::create_dir_all(base.join("img")).await.unwrap();
        let dest = base.join("img").join("photo.jpg");
        tokio::fs::write(&dest, b"already-here").await.unwrap();

        let backend = LocalBackend::new(SharedConfig::new(LocalConfig {
            base_dir: base.display().to_string(),
            public_base_url: "/uploads".to_string(),
        }));

        backend
            .upload(&dest, "photo.jpg", ArtifactKind::Image)
            .await
            .unwrap();
        let stored = tokio::fs::read(&dest).await.unwrap();
        assert_eq!(stored, b"already-here");
    }
}
