use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Opaque identifier for a captured photo
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoId(pub String);

impl PhotoId {
    /// Generate a new random photo ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PhotoId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PhotoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A captured photo and its stylization status.
///
/// Image payloads are not stored on the record itself; they live in the
/// session's side maps keyed by [`PhotoId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    /// Style key the photo was captured under
    pub mode: String,
    /// True while the stylization call is outstanding
    pub is_busy: bool,
    /// Stylization failure message; the photo stays visible in error state
    pub error: Option<String>,
}

impl Photo {
    /// Create a freshly captured (busy) photo
    pub fn new(id: PhotoId, mode: impl Into<String>) -> Self {
        Self {
            id,
            mode: mode.into(),
            is_busy: true,
            error: None,
        }
    }

    /// A photo is ready once stylization settled without an error
    pub fn is_ready(&self) -> bool {
        !self.is_busy && self.error.is_none()
    }
}

/// Desired capture orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Target aspect ratio for this orientation (width / height)
    pub fn target_aspect(self) -> f64 {
        match self {
            Orientation::Portrait => 9.0 / 16.0,
            Orientation::Landscape => 16.0 / 9.0,
        }
    }

    /// Fallback frame dimensions when the camera reports unusable values
    pub fn default_dimensions(self) -> (f64, f64) {
        match self {
            Orientation::Portrait => (1080.0, 1920.0),
            Orientation::Landscape => (1920.0, 1080.0),
        }
    }
}

/// An encoded GIF together with the scratch file backing it.
///
/// At most one artifact is live per session. Replacing it (or resetting the
/// session) must call [`GifArtifact::release`] first so handles cannot
/// accumulate across retakes in long-running sessions.
#[derive(Debug)]
pub struct GifArtifact {
    bytes: Bytes,
    scratch_path: Option<PathBuf>,
}

impl GifArtifact {
    /// Artifact held purely in memory
    pub fn in_memory(bytes: Bytes) -> Self {
        Self {
            bytes,
            scratch_path: None,
        }
    }

    /// Artifact backed by a scratch file that is removed on release
    pub fn with_scratch_file(bytes: Bytes, path: PathBuf) -> Self {
        Self {
            bytes,
            scratch_path: Some(path),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn scratch_path(&self) -> Option<&PathBuf> {
        self.scratch_path.as_ref()
    }

    /// Release the backing resource. Idempotent; removal failures are
    /// ignored because the scratch dir is session-scoped anyway.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(path) = self.scratch_path.take() {
            if let Err(err) = std::fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), error = %err, "gif scratch file removal failed");
            }
        }
    }
}

impl Drop for GifArtifact {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Handle to an active camera stream. `stop` must be idempotent; the session
/// controller calls it on reset so the device is free for the next user.
pub trait CameraStream: Send + Sync {
    fn stop(&self);
}
