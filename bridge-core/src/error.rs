/*!
Error types for the bridge core.
*/

use thiserror::Error;

/// Result type used throughout the bridge core.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors raised by the bridge collaborators.
///
/// Calling the facade before initialisation is not represented here: it is a
/// programming error and panics.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Text-safe encoding errors (base64)
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Compression/decompression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Integrity check failures
    #[error("Integrity check failed: expected hash {expected}, got {actual}")]
    IntegrityCheckFailed { expected: String, actual: String },

    /// Invalid persisted entry format
    #[error("Invalid entry format: {0}")]
    InvalidFormat(String),

    /// Persistent store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl BridgeError {
    /// Create a new encoding error
    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new invalid format error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Whether this error means the persisted bytes themselves are unusable,
    /// as opposed to the store being unreachable.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Json(_)
                | Self::Encoding(_)
                | Self::Compression(_)
                | Self::IntegrityCheckFailed { .. }
                | Self::InvalidFormat(_)
        )
    }
}
