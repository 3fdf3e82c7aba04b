//! In-process remote store.
//!
//! Tables are kept ordered by id, mirroring the `order=id.asc` reads of the
//! real backend. Failures can be injected per operation kind and every call
//! is recorded, which makes the reconciliation protocol observable.

use super::{RemotePage, RemoteStore};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use schoolbase_types::Record;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// A call made against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    FetchPage {
        table: String,
        offset: usize,
        limit: usize,
    },
    FetchIdPage {
        table: String,
        offset: usize,
        limit: usize,
    },
    Delete {
        table: String,
        ids: Vec<String>,
    },
    Upsert {
        table: String,
        ids: Vec<String>,
    },
}

#[derive(Debug, Default)]
struct Faults {
    fetch: bool,
    deletes_before_failure: Option<usize>,
    upserts_before_failure: Option<usize>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, BTreeMap<String, Record>>,
    ops: Vec<RemoteOp>,
    faults: Faults,
}

/// Remote store held in memory.
#[derive(Debug)]
pub struct MemoryRemoteStore {
    inner: Mutex<Inner>,
    report_totals: bool,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            report_totals: true,
        }
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Omit the total row count from pages, like a backend without exact counts.
    #[must_use]
    pub fn without_totals(mut self) -> Self {
        self.report_totals = false;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts or replaces records directly, bypassing fault injection and the op log.
    pub fn seed(&self, table: &str, records: impl IntoIterator<Item = Record>) {
        let mut inner = self.lock();
        let rows = inner.tables.entry(table.to_string()).or_default();
        for record in records {
            rows.insert(record.id().to_string(), record);
        }
    }

    /// Returns a table's rows ordered by id.
    pub fn records(&self, table: &str) -> Vec<Record> {
        self.lock()
            .tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns a table's ids in order.
    pub fn ids(&self, table: &str) -> Vec<String> {
        self.lock()
            .tables
            .get(table)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every call made so far.
    pub fn ops(&self) -> Vec<RemoteOp> {
        self.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }

    /// Makes every fetch fail until faults are cleared.
    pub fn fail_fetches(&self) {
        self.lock().faults.fetch = true;
    }

    /// Lets `n` more delete calls succeed, then fails the rest.
    pub fn fail_deletes_after(&self, n: usize) {
        self.lock().faults.deletes_before_failure = Some(n);
    }

    /// Lets `n` more upsert calls succeed, then fails the rest.
    pub fn fail_upserts_after(&self, n: usize) {
        self.lock().faults.upserts_before_failure = Some(n);
    }

    pub fn clear_faults(&self) {
        self.lock().faults = Faults::default();
    }

    fn page<T>(
        &self,
        inner: &Inner,
        table: &str,
        offset: usize,
        limit: usize,
        map: impl Fn(&Record) -> T,
    ) -> RemotePage<T> {
        let rows = inner.tables.get(table);
        let total = rows.map_or(0, BTreeMap::len);
        let page = rows
            .map(|rows| rows.values().skip(offset).take(limit).map(map).collect())
            .unwrap_or_default();
        RemotePage::new(page, self.report_totals.then_some(total))
    }
}

/// Decrements a fault budget, returning true when the call must fail.
fn spend(budget: &mut Option<usize>) -> bool {
    match budget {
        None => false,
        Some(0) => true,
        Some(n) => {
            *n -= 1;
            false
        }
    }
}

fn injected(what: &str, table: &str) -> SyncError {
    SyncError::Network(format!("injected {what} failure on {table}"))
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<RemotePage<Record>> {
        let mut inner = self.lock();
        inner.ops.push(RemoteOp::FetchPage {
            table: table.to_string(),
            offset,
            limit,
        });
        if inner.faults.fetch {
            return Err(injected("fetch", table));
        }
        Ok(self.page(&inner, table, offset, limit, Record::clone))
    }

    async fn fetch_id_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<RemotePage<String>> {
        let mut inner = self.lock();
        inner.ops.push(RemoteOp::FetchIdPage {
            table: table.to_string(),
            offset,
            limit,
        });
        if inner.faults.fetch {
            return Err(injected("fetch", table));
        }
        Ok(self.page(&inner, table, offset, limit, |r| r.id().to_string()))
    }

    async fn delete_by_ids(&self, table: &str, ids: &[String]) -> SyncResult<()> {
        let mut inner = self.lock();
        inner.ops.push(RemoteOp::Delete {
            table: table.to_string(),
            ids: ids.to_vec(),
        });
        if spend(&mut inner.faults.deletes_before_failure) {
            return Err(injected("delete", table));
        }
        if let Some(rows) = inner.tables.get_mut(table) {
            for id in ids {
                rows.remove(id);
            }
        }
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: &[Record], conflict_key: &str) -> SyncResult<()> {
        let mut inner = self.lock();
        inner.ops.push(RemoteOp::Upsert {
            table: table.to_string(),
            ids: rows.iter().map(|r| r.id().to_string()).collect(),
        });
        if conflict_key != "id" {
            return Err(SyncError::Protocol(format!(
                "unsupported conflict key {conflict_key:?}"
            )));
        }
        if spend(&mut inner.faults.upserts_before_failure) {
            return Err(injected("upsert", table));
        }
        let stored = inner.tables.entry(table.to_string()).or_default();
        for row in rows {
            stored.insert(row.id().to_string(), row.clone());
        }
        Ok(())
    }
}
