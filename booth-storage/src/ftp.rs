use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};
use tracing::{debug, warn};

use crate::backend::{ArtifactKind, BackendUpload, ConnectionTest, StorageBackend};
use crate::config::{FtpConfig, SharedConfig};
use crate::error::{StorageError, StorageResult};

/// Uploads artifacts to a plain FTP server.
///
/// The FTP client is synchronous, so every session runs inside
/// `spawn_blocking` with a fresh connection per call. Credentials are
/// snapshotted from the shared config at the start of each operation.
pub struct FtpBackend {
    config: SharedConfig<FtpConfig>,
}

impl FtpBackend {
    pub fn new(config: SharedConfig<FtpConfig>) -> Self {
        Self { config }
    }
}

fn connect(cfg: &FtpConfig) -> Result<FtpStream, suppaftp::FtpError> {
    let mut stream = FtpStream::connect((cfg.host.as_str(), cfg.port))?;
    stream.set_mode(Mode::Passive);
    stream.login(&cfg.username, &cfg.password)?;
    stream.transfer_type(FileType::Binary)?;
    Ok(stream)
}

/// Walk into `path` segment by segment, creating directories that do
/// not exist yet.
fn ensure_remote_dir(stream: &mut FtpStream, path: &str) -> Result<(), suppaftp::FtpError> {
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if stream.cwd(segment).is_err() {
            stream.mkdir(segment)?;
            stream.cwd(segment)?;
        }
    }
    Ok(())
}

fn upload_blocking(
    cfg: &FtpConfig,
    bytes: &[u8],
    remote_name: &str,
    kind: ArtifactKind,
) -> Result<String, suppaftp::FtpError> {
    let mut stream = connect(cfg)?;
    // Images land directly under the base path; GIFs get a subfolder.
    let base = cfg.base_dir.trim_end_matches('/');
    let remote_dir = if kind.is_gif() {
        format!("{base}/gif")
    } else {
        base.to_string()
    };
    ensure_remote_dir(&mut stream, &remote_dir)?;
    stream.put_file(remote_name, &mut Cursor::new(bytes))?;
    if let Err(e) = stream.quit() {
        warn!(error = %e, "ftp quit failed after upload");
    }
    Ok(format!("{remote_dir}/{remote_name}"))
}

#[async_trait]
impl StorageBackend for FtpBackend {
    fn name(&self) -> &'static str {
        "ftp"
    }

    async fn upload(
        &self,
        local_path: &Path,
        remote_name: &str,
        kind: ArtifactKind,
    ) -> StorageResult<BackendUpload> {
        let cfg = self.config.snapshot().await;
        if !cfg.is_configured() {
            return Err(StorageError::not_configured("FTP host or user missing"));
        }

        let bytes = tokio::fs::read(local_path).await?;
        let name = remote_name.to_string();
        let remote_path = tokio::task::spawn_blocking(move || {
            upload_blocking(&cfg, &bytes, &name, kind).map(|path| (path, cfg))
        })
        .await
        .map_err(StorageError::backend)?
        .map_err(StorageError::backend)?;
        let (remote_path, cfg) = remote_path;
        debug!(path = %remote_path, "uploaded to ftp");

        let public_url = if cfg.public_base_url.is_empty() {
            format!("ftp://{}{}", cfg.host, remote_path)
        } else if kind.is_gif() {
            format!("{}/gif/{}", cfg.public_base_url, remote_name)
        } else {
            format!("{}/{}", cfg.public_base_url, remote_name)
        };
        Ok(BackendUpload {
            public_url: public_url.clone(),
            download_url: Some(public_url.clone()),
            view_url: Some(public_url),
            remote_path: Some(remote_path),
        })
    }

    async fn test_connection(&self) -> ConnectionTest {
        let cfg = self.config.snapshot().await;
        if !cfg.is_configured() {
            return ConnectionTest::failed("FTP host or user missing");
        }
        let host = cfg.host.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut stream = connect(&cfg)?;
            let _ = stream.quit();
            Ok::<_, suppaftp::FtpError>(())
        })
        .await;
        match result {
            Ok(Ok(())) => ConnectionTest::ok(format!("Connected to {host}")),
            Ok(Err(e)) => ConnectionTest::failed(format!("FTP connection failed: {e}")),
            Err(e) => ConnectionTest::failed(format!("FTP task failed: {e}")),
        }
    }
}
