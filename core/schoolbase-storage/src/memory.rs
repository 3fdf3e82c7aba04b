//! In-memory snapshot store.

use crate::error::StorageResult;
use crate::store::{check_quota, entry_size, validate_key, SnapshotStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Snapshot store held entirely in memory, with an optional quota.
#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the total size of all entries.
    #[must_use]
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Total bytes currently counted against the quota.
    pub async fn used_bytes(&self) -> u64 {
        self.entries
            .read()
            .await
            .iter()
            .map(|(k, v)| entry_size(k, v.len() as u64))
            .sum()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        validate_key(key)?;
        let mut entries = self.entries.write().await;
        let used: u64 = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_size(k, v.len() as u64))
            .sum();
        check_quota(self.quota_bytes, key, value.len() as u64, used)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
