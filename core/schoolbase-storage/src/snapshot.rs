//! Reading and writing whole-collection snapshots.

use crate::error::{StorageError, StorageResult};
use crate::store::SnapshotStore;
use schoolbase_types::Record;
use serde_json::Value;
use tracing::warn;

/// Loads the snapshot stored under `key`.
///
/// Never fails: an absent key, an unreadable store or a value that is not a
/// JSON array all yield `fallback`. Rows without a usable `id` are skipped.
pub async fn load_collection(
    store: &dyn SnapshotStore,
    key: &str,
    fallback: Vec<Record>,
) -> Vec<Record> {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return fallback,
        Err(e) => {
            warn!("Failed to read local snapshot {}: {}", key, e);
            return fallback;
        }
    };

    match parse_collection(&raw) {
        Ok(records) => records,
        Err(e) => {
            warn!("Error parsing local snapshot {}: {}", key, e);
            fallback
        }
    }
}

/// Serialises `records` and stores them under `key`.
pub async fn save_collection(
    store: &dyn SnapshotStore,
    key: &str,
    records: &[Record],
) -> StorageResult<()> {
    let raw = serde_json::to_string(records)?;
    store.set(key, &raw).await
}

/// Parses a serialised snapshot.
pub fn parse_collection(raw: &str) -> StorageResult<Vec<Record>> {
    let Value::Array(rows) = serde_json::from_str::<Value>(raw)? else {
        return Err(StorageError::InvalidData(
            "snapshot is not a JSON array".to_string(),
        ));
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match Record::from_value(row) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping snapshot row: {}", e),
        }
    }
    Ok(records)
}
