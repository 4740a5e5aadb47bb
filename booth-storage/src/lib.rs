//! # booth-storage: multi-backend upload orchestration
//!
//! Given a locally written artifact, the [`UploadOrchestrator`] fans out to
//! every enabled storage backend, applies the watermark to image (non-GIF)
//! artifacts bound for remote storage, aggregates per-backend results and
//! errors without letting one failure abort the others, issues the QR code
//! for the primary result's public URL, and optionally removes the local
//! copy once a remote upload succeeded.
//!
//! Backends implement the [`StorageBackend`] capability contract:
//!
//! - **Local**: `img/` / `gif/` subdirectories under the upload base,
//!   public URL composed from the configured base URL.
//! - **FTP**: per-call connection, binary transfer into the configured
//!   remote path (`.../gif` for GIFs), display URL from config.
//! - **Nextcloud**: idempotent WebDAV directory chain, PUT upload, then an
//!   OCS public share; no share means no usable result for this backend.
//! - **Google Drive**: service-account JWT cached per credential identity,
//!   multipart upload into the configured folder, optional anyone-with-link
//!   permission.
//!
//! Backend configuration is runtime-mutable through [`SharedConfig`]; every
//! operation clones a snapshot up front so an admin update can never be
//! observed half-applied mid-upload.

pub mod backend;
pub mod config;
pub mod ftp;
pub mod gdrive;
pub mod local;
pub mod nextcloud;
pub mod orchestrator;

mod error;

pub use backend::{ArtifactKind, BackendUpload, ConnectionTest, StorageBackend};
pub use config::{
    FtpConfig, FtpConfigUpdate, GoogleDriveConfig, LocalConfig, NextcloudConfig,
    NextcloudConfigUpdate, SharedConfig, StorageSettings,
};
pub use error::{StorageError, StorageResult};
pub use ftp::FtpBackend;
pub use gdrive::GoogleDriveBackend;
pub use local::LocalBackend;
pub use nextcloud::NextcloudBackend;
pub use orchestrator::{StorageOutcome, UploadOrchestrator, UploadOutcome, UploadRequest};
