use thiserror::Error;

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during frame composition, GIF encoding, or QR
/// rendering
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Source image missing or undecodable: {reason}")]
    Decode { reason: String },

    #[error("GIF encoding failed: {reason}")]
    Encode { reason: String },

    #[error("QR rendering failed: {reason}")]
    Qr { reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MediaError {
    /// Create a decode error
    pub fn decode<S: Into<String>>(reason: S) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Create an encode error
    pub fn encode<S: Into<String>>(reason: S) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }

    /// Create a QR rendering error
    pub fn qr<S: Into<String>>(reason: S) -> Self {
        Self::Qr {
            reason: reason.into(),
        }
    }
}
