use thiserror::Error;

/// Result type for session operations
pub type BoothResult<T> = Result<T, BoothError>;

/// Errors that can occur while coordinating a photobooth session
#[derive(Error, Debug)]
pub enum BoothError {
    #[error("Photo not found: {id}")]
    PhotoNotFound { id: String },

    #[error("Stylization failed: {reason}")]
    Stylization { reason: String },

    #[error("GIF assembly failed: {reason}")]
    GifAssembly { reason: String },

    #[error("Share preparation failed: {reason}")]
    Share { reason: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BoothError {
    /// Create a not found error
    pub fn photo_not_found<S: Into<String>>(id: S) -> Self {
        Self::PhotoNotFound { id: id.into() }
    }

    /// Create a stylization error
    pub fn stylization<S: Into<String>>(reason: S) -> Self {
        Self::Stylization {
            reason: reason.into(),
        }
    }

    /// Create a GIF assembly error
    pub fn gif_assembly<S: Into<String>>(reason: S) -> Self {
        Self::GifAssembly {
            reason: reason.into(),
        }
    }

    /// Create a share preparation error
    pub fn share<S: Into<String>>(reason: S) -> Self {
        Self::Share {
            reason: reason.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
