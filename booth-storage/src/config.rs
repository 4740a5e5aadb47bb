//! Backend configuration, environment loading, and live-updatable
//! shared handles.
//!
//! Each backend config knows how to load itself from the environment,
//! merge a partial update from the admin API, and produce a sanitized
//! copy with secrets masked for read-back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Strip trailing slashes from a server URL.
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Normalize a remote folder path: single leading slash, no trailing
/// slash, duplicate separators collapsed. Empty input becomes "/".
pub fn normalize_folder(folder: &str) -> String {
    let segments: Vec<&str> = folder.trim().split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

const SECRET_MASK: &str = "********";

fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        SECRET_MASK.to_string()
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalConfig {
    /// Directory holding the img/ and gif/ subdirectories.
    pub base_dir: String,
    /// Public URL prefix the server exposes the directory under.
    pub public_base_url: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_dir: "uploads".to_string(),
            public_base_url: "/uploads".to_string(),
        }
    }
}

impl LocalConfig {
    pub fn from_env() -> Self {
        Self {
            base_dir: env_string("UPLOAD_BASE_DIR").unwrap_or_else(|| "uploads".to_string()),
            public_base_url: env_string("PUBLIC_BASE_URL")
                .map(|u| normalize_url(&u) + "/uploads")
                .unwrap_or_else(|| "/uploads".to_string()),
        }
    }
}

/// FTP backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Remote base directory uploads land under.
    pub base_dir: String,
    /// Public URL prefix that maps onto `base_dir`.
    pub public_base_url: String,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            username: String::new(),
            password: String::new(),
            base_dir: "/".to_string(),
            public_base_url: String::new(),
        }
    }
}

impl FtpConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_string("FTP_HOST").unwrap_or_default(),
            port: env_u16("FTP_PORT", 21),
            username: env_string("FTP_USER").unwrap_or_default(),
            password: env_string("FTP_PASSWORD").unwrap_or_default(),
            base_dir: normalize_folder(&env_string("FTP_BASE_DIR").unwrap_or_default()),
            public_base_url: env_string("FTP_PUBLIC_URL")
                .map(|u| normalize_url(&u))
                .unwrap_or_default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.username.is_empty()
    }

    /// Apply a partial update from the admin API.
    pub fn merged(&self, update: FtpConfigUpdate) -> Self {
        Self {
            host: update.host.map(|h| normalize_url(&h)).unwrap_or_else(|| self.host.clone()),
            port: update.port.unwrap_or(self.port),
            username: update.username.unwrap_or_else(|| self.username.clone()),
            password: update.password.unwrap_or_else(|| self.password.clone()),
            base_dir: update
                .base_dir
                .map(|d| normalize_folder(&d))
                .unwrap_or_else(|| self.base_dir.clone()),
            public_base_url: update
                .public_base_url
                .map(|u| normalize_url(&u))
                .unwrap_or_else(|| self.public_base_url.clone()),
        }
    }

    /// Copy with secrets masked, for config read-back endpoints.
    pub fn sanitized(&self) -> Self {
        Self {
            password: mask_secret(&self.password),
            ..self.clone()
        }
    }
}

/// Partial FTP config update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpConfigUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub base_dir: Option<String>,
    pub public_base_url: Option<String>,
}

/// Nextcloud backend configuration (WebDAV upload + OCS public share).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextcloudConfig {
    pub server_url: String,
    pub username: String,
    /// App password, not the account password.
    pub password: String,
    /// Remote folder uploads land under.
    pub folder: String,
    /// Password protecting the public share; empty means unprotected.
    pub share_password: String,
    /// Days until the public share expires; 0 means no expiry.
    pub share_expiry_days: u32,
}

impl Default for NextcloudConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            username: String::new(),
            password: String::new(),
            folder: "/DigiOH".to_string(),
            share_password: String::new(),
            share_expiry_days: 0,
        }
    }
}

impl NextcloudConfig {
    pub fn from_env() -> Self {
        Self {
            server_url: env_string("NEXTCLOUD_URL")
                .map(|u| normalize_url(&u))
                .unwrap_or_default(),
            username: env_string("NEXTCLOUD_USER").unwrap_or_default(),
            password: env_string("NEXTCLOUD_PASSWORD").unwrap_or_default(),
            folder: normalize_folder(
                &env_string("NEXTCLOUD_FOLDER").unwrap_or_else(|| "/DigiOH".to_string()),
            ),
            share_password: env_string("NEXTCLOUD_SHARE_PASSWORD").unwrap_or_default(),
            share_expiry_days: std::env::var("NEXTCLOUD_SHARE_EXPIRY_DAYS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.server_url.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }

    /// Root of the WebDAV tree for this user.
    pub fn dav_root(&self) -> String {
        format!(
            "{}/remote.php/dav/files/{}",
            self.server_url, self.username
        )
    }

    pub fn merged(&self, update: NextcloudConfigUpdate) -> Self {
        Self {
            server_url: update
                .server_url
                .map(|u| normalize_url(&u))
                .unwrap_or_else(|| self.server_url.clone()),
            username: update.username.unwrap_or_else(|| self.username.clone()),
            password: update.password.unwrap_or_else(|| self.password.clone()),
            folder: update
                .folder
                .map(|f| normalize_folder(&f))
                .unwrap_or_else(|| self.folder.clone()),
            share_password: update
                .share_password
                .unwrap_or_else(|| self.share_password.clone()),
            share_expiry_days: update.share_expiry_days.unwrap_or(self.share_expiry_days),
        }
    }

    pub fn sanitized(&self) -> Self {
        Self {
            password: mask_secret(&self.password),
            share_password: mask_secret(&self.share_password),
            ..self.clone()
        }
    }
}

/// Partial Nextcloud config update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextcloudConfigUpdate {
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub folder: Option<String>,
    pub share_password: Option<String>,
    pub share_expiry_days: Option<u32>,
}

/// Google Drive backend configuration (service account).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleDriveConfig {
    pub client_email: String,
    /// PEM-encoded RSA private key from the service account JSON.
    pub private_key: String,
    /// Destination folder id; empty uploads to the drive root.
    pub folder_id: String,
    /// Separate folder for GIFs; empty falls back to `folder_id`.
    pub gif_folder_id: String,
    /// Account to impersonate via domain-wide delegation, if any.
    pub impersonated_user: String,
}

impl GoogleDriveConfig {
    pub fn from_env() -> Self {
        Self {
            client_email: env_string("GDRIVE_CLIENT_EMAIL").unwrap_or_default(),
            private_key: env_string("GDRIVE_PRIVATE_KEY")
                .map(|k| k.replace("\\n", "\n"))
                .unwrap_or_default(),
            folder_id: env_string("GDRIVE_FOLDER_ID").unwrap_or_default(),
            gif_folder_id: env_string("GDRIVE_GIF_FOLDER_ID").unwrap_or_default(),
            impersonated_user: env_string("GDRIVE_IMPERSONATE_USER").unwrap_or_default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.client_email.is_empty() && !self.private_key.is_empty()
    }

    pub fn sanitized(&self) -> Self {
        Self {
            private_key: mask_secret(&self.private_key),
            ..self.clone()
        }
    }
}

/// Which backends participate in an upload and which one is primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    /// Preferred provider for the visitor-facing URL.
    pub provider: String,
    pub enable_local: bool,
    pub enable_ftp: bool,
    pub enable_nextcloud: bool,
    pub enable_gdrive: bool,
    /// Keep the local copy even after a remote upload succeeds.
    pub keep_local: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            enable_local: true,
            enable_ftp: false,
            enable_nextcloud: false,
            enable_gdrive: false,
            keep_local: false,
        }
    }
}

impl StorageSettings {
    pub fn from_env() -> Self {
        Self {
            provider: env_string("STORAGE_PROVIDER").unwrap_or_else(|| "local".to_string()),
            enable_local: env_bool("ENABLE_LOCAL_STORAGE", true),
            enable_ftp: env_bool("ENABLE_FTP", false),
            enable_nextcloud: env_bool("ENABLE_NEXTCLOUD", false),
            enable_gdrive: env_bool("ENABLE_GDRIVE", false),
            keep_local: env_bool("KEEP_LOCAL_COPIES", false),
        }
    }
}

/// Shared, live-updatable configuration handle.
///
/// Backends hold one of these and snapshot it at the start of each
/// operation, so an admin update takes effect on the next upload
/// without tearing anything down.
#[derive(Debug)]
pub struct SharedConfig<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Clone for SharedConfig<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> SharedConfig<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Copy of the current value. Operations work on the snapshot so a
    /// concurrent update cannot change credentials mid-flight.
    pub async fn snapshot(&self) -> T {
        self.inner.read().await.clone()
    }

    /// Replace the value wholesale.
    pub async fn replace(&self, value: T) {
        *self.inner.write().await = value;
    }

    /// Update the value in place through a closure.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let mut guard = self.inner.write().await;
        f(&mut guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_urls_and_folders() {
        assert_eq!(normalize_url("https://cloud.example.com/"), "https://cloud.example.com");
        assert_eq!(normalize_url("  https://x.io//  "), "https://x.io");
        assert_eq!(normalize_folder("DigiOH/"), "/DigiOH");
        assert_eq!(normalize_folder("/a/b/"), "/a/b");
        assert_eq!(normalize_folder(""), "/");
        assert_eq!(normalize_folder("///"), "/");
        assert_eq!(normalize_folder("a//b/"), "/a/b");
    }

    #[test]
    fn nextcloud_dav_root() {
        let cfg = NextcloudConfig {
            server_url: "https://cloud.example.com".to_string(),
            username: "booth".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        };
        assert_eq!(
            cfg.dav_root(),
            "https://cloud.example.com/remote.php/dav/files/booth"
        );
    }

    #[test]
    fn merged_update_keeps_absent_fields() {
        let cfg = NextcloudConfig {
            server_url: "https://cloud.example.com".to_string(),
            username: "booth".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        };
        let merged = cfg.merged(NextcloudConfigUpdate {
            folder: Some("events/2026".to_string()),
            ..Default::default()
        });
        assert_eq!(merged.folder, "/events/2026");
        assert_eq!(merged.username, "booth");
        assert_eq!(merged.password, "secret");
    }

    #[test]
    fn sanitized_masks_secrets() {
        let cfg = FtpConfig {
            host: "ftp.example.com".to_string(),
            password: "hunter2".to_string(),
            ..Default::default()
        };
        let safe = cfg.sanitized();
        assert_eq!(safe.password, "********");
        assert_eq!(safe.host, "ftp.example.com");

        let empty = FtpConfig::default().sanitized();
        assert_eq!(empty.password, "");
    }

    #[tokio::test]
    async fn shared_config_snapshot_isolated_from_updates() {
        let shared = SharedConfig::new(FtpConfig::default());
        let before = shared.snapshot().await;
        shared
            .update(|c| c.host = "ftp.example.com".to_string())
            .await;
        assert!(before.host.is_empty());
        assert_eq!(shared.snapshot().await.host, "ftp.example.com");
    }
}
