//! Local snapshot store abstraction.
//!
//! A durable string key/value store on the client device. Each collection
//! keeps its full serialised snapshot under one key.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;

/// Durable key/value storage for serialised snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns the name of the backing store (for logs).
    fn backend_name(&self) -> &'static str;

    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Fails with [`StorageError::QuotaExceeded`] if the store is full; the
    /// previous value is then left untouched.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Lists all stored keys, sorted.
    async fn keys(&self) -> StorageResult<Vec<String>>;
}

/// Keys map directly to file names, so only a conservative alphabet is allowed.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Bytes an entry counts against the quota.
pub(crate) fn entry_size(key: &str, value_len: u64) -> u64 {
    key.len() as u64 + value_len
}

/// Checks that replacing `key` with a value of `value_len` bytes fits.
///
/// `used_by_others` is the usage of every other key.
pub(crate) fn check_quota(
    quota: Option<u64>,
    key: &str,
    value_len: u64,
    used_by_others: u64,
) -> StorageResult<()> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let needed = entry_size(key, value_len);
    let available = quota.saturating_sub(used_by_others);
    if needed > available {
        return Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            needed,
            available,
        });
    }
    Ok(())
}
