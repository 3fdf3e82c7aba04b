//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing the value would exceed the store's quota.
    #[error("storage quota exceeded for {key}: needs {needed} bytes, {available} available")]
    QuotaExceeded {
        key: String,
        needed: u64,
        available: u64,
    },

    /// Key contains characters that cannot be stored.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// Stored value is not a valid collection snapshot.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// Returns true if this error is a quota rejection.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}
