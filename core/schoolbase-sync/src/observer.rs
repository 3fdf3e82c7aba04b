//! Reacts to local collection changes.
//!
//! Every change is written to the local snapshot store first (best effort)
//! and then handed to the scheduler for a background push.

use crate::error::{SyncError, SyncResult};
use crate::scheduler::{PushOutcome, SyncScheduler};
use schoolbase_storage::{save_collection, SnapshotStore};
use schoolbase_types::{CollectionRegistry, Record};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// What handling one change did.
#[derive(Debug)]
pub struct ChangeOutcome {
    /// Whether the local snapshot write succeeded.
    pub saved_locally: bool,
    /// Background push, for synchronized collections.
    pub push: Option<JoinHandle<PushOutcome>>,
}

/// Persists changes locally and schedules remote pushes.
pub struct ChangeObserver {
    registry: Arc<CollectionRegistry>,
    local: Arc<dyn SnapshotStore>,
    scheduler: Arc<SyncScheduler>,
}

impl ChangeObserver {
    pub fn new(
        registry: Arc<CollectionRegistry>,
        local: Arc<dyn SnapshotStore>,
        scheduler: Arc<SyncScheduler>,
    ) -> Self {
        Self {
            registry,
            local,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &Arc<SyncScheduler> {
        &self.scheduler
    }

    /// Handles a new local state for `collection`.
    ///
    /// Storage failures (including a full quota) are logged and reported via
    /// [`ChangeOutcome::saved_locally`]; only an unknown collection is an error.
    pub async fn on_change(&self, collection: &str, records: &[Record]) -> SyncResult<ChangeOutcome> {
        let spec = self
            .registry
            .get(collection)
            .ok_or_else(|| SyncError::UnknownCollection(collection.to_string()))?;

        let saved_locally = self.save_local(&spec.local_key, records).await;

        let push = spec
            .synchronized
            .then(|| self.scheduler.spawn_push(collection, records.to_vec()));

        Ok(ChangeOutcome {
            saved_locally,
            push,
        })
    }

    /// Writes a snapshot, logging instead of failing.
    pub async fn save_local(&self, key: &str, records: &[Record]) -> bool {
        match save_collection(self.local.as_ref(), key, records).await {
            Ok(()) => true,
            Err(e) if e.is_quota_exceeded() => {
                warn!("Local storage full for {}, relying on cloud sync", key);
                false
            }
            Err(e) => {
                warn!("Failed to write local snapshot {}: {}", key, e);
                false
            }
        }
    }
}
