use std::path::{Path, PathBuf};
use std::sync::Arc;

use booth_media::Watermarker;
use booth_storage::{
    FtpBackend, FtpConfig, GoogleDriveBackend, GoogleDriveConfig, LocalBackend, LocalConfig,
    NextcloudBackend, NextcloudConfig, SharedConfig, StorageSettings, UploadOrchestrator,
};
use tracing::info;

/// Shared application state handed to every handler.
///
/// The config handles are the same ones the orchestrator's backends
/// snapshot, so an admin update takes effect on the next upload.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<UploadOrchestrator>,
    pub settings: SharedConfig<StorageSettings>,
    pub local: SharedConfig<LocalConfig>,
    pub ftp: SharedConfig<FtpConfig>,
    pub nextcloud: SharedConfig<NextcloudConfig>,
    pub gdrive: SharedConfig<GoogleDriveConfig>,
    pub upload_dir: PathBuf,
    /// Absolute URL prefix for QR targets; empty means relative URLs only.
    pub public_base_url: String,
}

impl AppState {
    /// Build the full state from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let local_cfg = LocalConfig::from_env();
        let upload_dir = PathBuf::from(&local_cfg.base_dir);
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .unwrap_or_default();

        let watermark = match std::env::var("WATERMARK_PATH") {
            Ok(path) if !path.trim().is_empty() => Watermarker::from_path(Some(Path::new(&path))),
            _ => Watermarker::disabled(),
        };

        Self::new(
            StorageSettings::from_env(),
            local_cfg,
            FtpConfig::from_env(),
            NextcloudConfig::from_env(),
            GoogleDriveConfig::from_env(),
            watermark,
            upload_dir,
            public_base_url,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: StorageSettings,
        local_cfg: LocalConfig,
        ftp_cfg: FtpConfig,
        nextcloud_cfg: NextcloudConfig,
        gdrive_cfg: GoogleDriveConfig,
        watermark: Watermarker,
        upload_dir: PathBuf,
        public_base_url: String,
    ) -> anyhow::Result<Self> {
        info!(
            provider = %settings.provider,
            local = settings.enable_local,
            ftp = settings.enable_ftp,
            nextcloud = settings.enable_nextcloud,
            gdrive = settings.enable_gdrive,
            "storage configured"
        );

        let settings = SharedConfig::new(settings);
        let local = SharedConfig::new(local_cfg);
        let ftp = SharedConfig::new(ftp_cfg);
        let nextcloud = SharedConfig::new(nextcloud_cfg);
        let gdrive = SharedConfig::new(gdrive_cfg);

        let orchestrator = Arc::new(UploadOrchestrator::new(
            settings.clone(),
            Arc::new(LocalBackend::new(local.clone())),
            Arc::new(FtpBackend::new(ftp.clone())),
            Arc::new(NextcloudBackend::new(nextcloud.clone())?),
            Arc::new(GoogleDriveBackend::new(gdrive.clone())?),
            Arc::new(watermark),
        ));

        Ok(Self {
            orchestrator,
            settings,
            local,
            ftp,
            nextcloud,
            gdrive,
            upload_dir,
            public_base_url,
        })
    }
}
