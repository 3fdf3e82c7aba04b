//! Sync protocol configuration.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};

/// Rows requested per page when scanning a remote table.
pub const FETCH_PAGE_SIZE: usize = 1000;
/// Identifiers per delete request.
pub const DELETE_BATCH_SIZE: usize = 100;
/// Records per upsert request.
pub const UPSERT_BATCH_SIZE: usize = 500;
/// Column used as the upsert merge key.
pub const CONFLICT_KEY: &str = "id";

/// Configuration for fetch and push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Rows per page for bulk fetch and id discovery.
    pub page_size: usize,
    /// Identifiers per delete batch.
    pub delete_batch_size: usize,
    /// Records per upsert batch.
    pub upsert_batch_size: usize,
    /// Upsert conflict column.
    pub conflict_key: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: FETCH_PAGE_SIZE,
            delete_batch_size: DELETE_BATCH_SIZE,
            upsert_batch_size: UPSERT_BATCH_SIZE,
            conflict_key: CONFLICT_KEY.to_string(),
        }
    }
}

impl SyncConfig {
    /// Rejects zero sizes and an empty conflict key.
    pub fn validate(&self) -> SyncResult<()> {
        if self.page_size == 0 {
            return Err(SyncError::Config("page_size must be positive".into()));
        }
        if self.delete_batch_size == 0 {
            return Err(SyncError::Config("delete_batch_size must be positive".into()));
        }
        if self.upsert_batch_size == 0 {
            return Err(SyncError::Config("upsert_batch_size must be positive".into()));
        }
        if self.conflict_key.is_empty() {
            return Err(SyncError::Config("conflict_key must not be empty".into()));
        }
        Ok(())
    }
}
