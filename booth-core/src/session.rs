//! Session state and context.
//!
//! The original design kept a module-level mutable store; here the state is
//! an explicit [`SessionContext`] handed to every coordinating function so
//! independent sessions can coexist and tests construct their own.

use bytes::Bytes;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::{CameraStream, GifArtifact, Photo, PhotoId};

/// Style key that resolves the session's custom prompt instead of the
/// mode catalog.
pub const CUSTOM_MODE: &str = "custom";

/// Terminal status of a download-preparation attempt for one photo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareStatus {
    Ready,
    Errored,
}

/// QR code data URLs for the two shareable artifacts
#[derive(Debug, Clone, Default)]
pub struct QrCodes {
    pub photo: Option<String>,
    pub gif: Option<String>,
}

/// Cloud URL cache key for the session GIF (photos are keyed by their id)
pub const GIF_URL_KEY: &str = "gif";

/// Mutable state of one photobooth session. Lifecycle: first capture to
/// retake/reset.
#[derive(Default)]
pub struct SessionState {
    /// Photo queue, newest first
    pub photos: Vec<Photo>,
    pub active_mode: String,
    pub custom_prompt: String,
    /// At most one live GIF; replacing it must release the prior handle
    pub gif: Option<GifArtifact>,
    pub gif_in_progress: bool,
    pub did_init: bool,
    /// Captured frames keyed by photo id
    pub inputs: HashMap<PhotoId, Bytes>,
    /// Stylized results keyed by photo id
    pub outputs: HashMap<PhotoId, Bytes>,
    /// Watermarked preview cache; pruned whenever the photo list changes
    pub watermarked_previews: HashMap<PhotoId, Bytes>,
    pub prepared: HashMap<PhotoId, PrepareStatus>,
    pub qr_codes: QrCodes,
    /// Public URLs keyed by photo id, plus [`GIF_URL_KEY`] for the GIF
    pub cloud_urls: HashMap<String, String>,
    pub is_uploading: bool,
    pub camera: Option<Arc<dyn CameraStream>>,
}

impl SessionState {
    /// Drop watermarked-preview entries whose photo left the queue
    pub fn prune_orphan_previews(&mut self) {
        let live: Vec<PhotoId> = self.photos.iter().map(|p| p.id.clone()).collect();
        self.watermarked_previews.retain(|id, _| live.contains(id));
    }

    pub fn photo(&self, id: &PhotoId) -> Option<&Photo> {
        self.photos.iter().find(|p| p.id == *id)
    }

    pub fn photo_mut(&mut self, id: &PhotoId) -> Option<&mut Photo> {
        self.photos.iter_mut().find(|p| p.id == *id)
    }
}

/// Explicit per-session context: the state plus two monotonically
/// increasing tokens used for logical cancellation. Async continuations
/// compare their captured token before committing results; a mismatch
/// means a newer flow superseded them.
///
/// The epoch only moves on retake/reset and guards capture and GIF
/// commits. The prepare token additionally moves on every
/// download-preparation attempt, so a re-run supersedes the in-flight
/// one without cancelling unrelated stylizations.
pub struct SessionContext {
    state: Mutex<SessionState>,
    epoch: AtomicU64,
    prepare_token: AtomicU64,
    scratch_dir: Option<PathBuf>,
}

impl SessionContext {
    pub fn new(active_mode: impl Into<String>) -> Self {
        let state = SessionState {
            active_mode: active_mode.into(),
            ..SessionState::default()
        };
        Self {
            state: Mutex::new(state),
            epoch: AtomicU64::new(0),
            prepare_token: AtomicU64::new(0),
            scratch_dir: None,
        }
    }

    /// Back GIF artifacts with scratch files under `dir` so released
    /// handles free disk as well as memory
    pub fn with_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = Some(dir);
        self
    }

    pub fn scratch_dir(&self) -> Option<&PathBuf> {
        self.scratch_dir.as_ref()
    }

    /// Lock the session state. Callers must not hold the guard across an
    /// await point; every suspension re-acquires and re-validates.
    pub fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// One-time initialization flag, mirroring the client boot path
    pub fn init(&self) {
        let mut state = self.state();
        if !state.did_init {
            state.did_init = true;
        }
    }

    pub fn set_mode(&self, mode: impl Into<String>) {
        self.state().active_mode = mode.into();
    }

    pub fn set_custom_prompt(&self, prompt: impl Into<String>) {
        self.state().custom_prompt = prompt.into();
    }

    pub fn attach_camera(&self, camera: Arc<dyn CameraStream>) {
        self.state().camera = Some(camera);
    }

    /// Snapshot of the photo queue
    pub fn photos(&self) -> Vec<Photo> {
        self.state().photos.clone()
    }

    /// Current session epoch
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Bump the epoch, invalidating every in-flight continuation of the
    /// previous session. Also supersedes any in-flight preparation.
    pub fn next_epoch(&self) -> u64 {
        self.next_prepare_token();
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current download-preparation token
    pub fn prepare_token(&self) -> u64 {
        self.prepare_token.load(Ordering::SeqCst)
    }

    /// Claim a fresh preparation token, superseding any preparation still
    /// in flight
    pub fn next_prepare_token(&self) -> u64 {
        self.prepare_token.fetch_add(1, Ordering::SeqCst) + 1
    }
}
