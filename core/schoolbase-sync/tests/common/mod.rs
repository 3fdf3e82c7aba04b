#![allow(dead_code)]

use async_trait::async_trait;
use schoolbase_sync::{MemoryRemoteStore, RemotePage, RemoteStore, SyncResult};
use schoolbase_types::Record;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub fn record(id: &str, name: &str) -> Record {
    Record::from_value(json!({"id": id, "name": name})).unwrap()
}

pub fn records(ids: &[&str]) -> Vec<Record> {
    ids.iter().map(|id| record(id, "x")).collect()
}

/// `count` records with zero-padded ids so id order matches insertion order.
pub fn numbered(prefix: &str, count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| record(&format!("{prefix}{i:05}"), "row"))
        .collect()
}

pub fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.id().to_string()).collect()
}

/// Wraps a memory store and can hold the next push at its id scan.
///
/// Every push begins with an id page at offset 0, so `scans()` counts pushes.
pub struct GatedStore {
    inner: Arc<MemoryRemoteStore>,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
    scans: AtomicUsize,
}

impl GatedStore {
    pub fn new(inner: Arc<MemoryRemoteStore>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
            scans: AtomicUsize::new(0),
        }
    }

    /// The next push blocks until `release` is called.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Waits until an armed push is blocked at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for GatedStore {
    fn provider_name(&self) -> &'static str {
        "gated"
    }

    async fn fetch_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<RemotePage<Record>> {
        self.inner.fetch_page(table, offset, limit).await
    }

    async fn fetch_id_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<RemotePage<String>> {
        if offset == 0 {
            self.scans.fetch_add(1, Ordering::SeqCst);
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
        }
        self.inner.fetch_id_page(table, offset, limit).await
    }

    async fn delete_by_ids(&self, table: &str, ids: &[String]) -> SyncResult<()> {
        self.inner.delete_by_ids(table, ids).await
    }

    async fn upsert(&self, table: &str, rows: &[Record], conflict_key: &str) -> SyncResult<()> {
        self.inner.upsert(table, rows, conflict_key).await
    }
}
