//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered with a non-success status.
    #[error("remote store returned {status}: {body}")]
    Remote { status: u16, body: String },

    /// Network error from a non-HTTP backend.
    #[error("network error: {0}")]
    Network(String),

    /// Protocol error (unexpected response shape).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record failed validation.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] schoolbase_types::Error),

    /// Local snapshot store error.
    #[error("storage error: {0}")]
    Storage(#[from] schoolbase_storage::StorageError),

    /// Collection is not in the registry.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// A full sync is already running.
    #[error("sync already in progress")]
    AlreadySyncing,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Returns true if retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Http(_) | SyncError::Network(_) => true,
            SyncError::Remote { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
