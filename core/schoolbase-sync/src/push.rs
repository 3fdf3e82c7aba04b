//! Reconciling push: makes a remote table an exact mirror of local state.
//!
//! Three phases:
//! 1. Scan every remote identifier (full paginated scan, ids only).
//! 2. Compute `remote - local` as the set of stale ids.
//! 3. Delete stale ids in batches, then upsert all local records in batches.
//!
//! A failing batch aborts the rest; batches already applied stay applied.
//! Both phases are keyed by id, so re-running the same push converges.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::fetch::fetch_remote_ids;
use crate::remote::RemoteStore;
use schoolbase_types::Record;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// What a successful push did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushReport {
    pub table: String,
    /// Remote row count before the push.
    pub remote_before: usize,
    pub deleted: usize,
    pub upserted: usize,
    pub delete_batches: usize,
    pub upsert_batches: usize,
}

/// Pushes `records` so that `table` ends up holding exactly those rows.
///
/// An empty `records` slice clears the remote table.
pub async fn push_collection(
    store: &dyn RemoteStore,
    table: &str,
    records: &[Record],
    config: &SyncConfig,
) -> SyncResult<PushReport> {
    config.validate()?;

    let remote_ids = fetch_remote_ids(store, table, config).await?;
    let mut report = PushReport {
        table: table.to_string(),
        remote_before: remote_ids.len(),
        ..Default::default()
    };

    let stale = stale_ids(&remote_ids, records);
    for batch in stale.chunks(config.delete_batch_size) {
        store.delete_by_ids(table, batch).await?;
        report.deleted += batch.len();
        report.delete_batches += 1;
        debug!("{}: deleted batch of {}", table, batch.len());
    }

    let rows = collapse_duplicates(records);
    for batch in rows.chunks(config.upsert_batch_size) {
        store.upsert(table, batch, &config.conflict_key).await?;
        report.upserted += batch.len();
        report.upsert_batches += 1;
        debug!("{}: upserted batch of {}", table, batch.len());
    }

    info!(
        "Pushed {}: {} remote before, {} deleted, {} upserted",
        table, report.remote_before, report.deleted, report.upserted
    );
    Ok(report)
}

/// Remote ids with no local record, in remote order.
pub fn stale_ids(remote_ids: &[String], records: &[Record]) -> Vec<String> {
    let local: HashSet<&str> = records.iter().map(Record::id).collect();
    let mut seen = HashSet::new();
    remote_ids
        .iter()
        .filter(|id| !local.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Keeps only the last record for each id so no batch repeats a key.
fn collapse_duplicates(records: &[Record]) -> Cow<'_, [Record]> {
    let mut last: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        last.insert(record.id(), i);
    }
    if last.len() == records.len() {
        return Cow::Borrowed(records);
    }

    debug!(
        "Collapsing {} duplicate ids before upsert",
        records.len() - last.len()
    );
    Cow::Owned(
        records
            .iter()
            .enumerate()
            .filter(|(i, r)| last.get(r.id()) == Some(i))
            .map(|(_, r)| r.clone())
            .collect(),
    )
}
