/*!
Error types for the audit trail core engine.
*/

use thiserror::Error;

/// Result type used throughout the audit trail core.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors that can occur during archive operations.
#[derive(Error, Debug)]
pub enum AuditError {
    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compression/decompression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Integrity check failures
    #[error("Integrity check failed: expected hash {expected}, got {actual}")]
    IntegrityCheckFailed { expected: String, actual: String },

    /// Invalid archive format
    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    /// Retrieval found no extracted data to deserialize
    #[error("No extracted data available for archive '{identity}'")]
    MissingIntermediate { identity: String },

    /// Malformed dataset (ragged rows, bad shape)
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// Storage adapter errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AuditError {
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

    /// Create a new invalid dataset error
    pub fn invalid_dataset<S: Into<String>>(msg: S) -> Self {
        Self::InvalidDataset(msg.into())
    }

    /// Create the missing intermediate error for an archive identity
    pub fn missing_intermediate<S: Into<String>>(identity: S) -> Self {
        Self::MissingIntermediate {
            identity: identity.into(),
        }
    }
}
