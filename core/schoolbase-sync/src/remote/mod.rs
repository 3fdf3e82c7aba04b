//! Remote collection stores.
//!
//! The sync engine only needs four operations from the backend: read a page
//! of rows, read a page of ids, delete by id, and upsert keyed by id.

pub mod memory;
pub mod postgrest;

pub use memory::{MemoryRemoteStore, RemoteOp};
pub use postgrest::{PostgrestConfig, PostgrestStore};

use crate::error::SyncResult;
use async_trait::async_trait;
use schoolbase_types::Record;

/// One page of a paginated read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePage<T> {
    /// Rows in identifier order.
    pub rows: Vec<T>,
    /// Total rows in the table, if the backend reported it.
    pub total: Option<usize>,
}

impl<T> RemotePage<T> {
    pub fn new(rows: Vec<T>, total: Option<usize>) -> Self {
        Self { rows, total }
    }
}

/// Abstract multi-tenant table store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the name of the backend provider.
    fn provider_name(&self) -> &'static str;

    /// Reads rows `[offset, offset + limit)` of `table`, ordered by id.
    async fn fetch_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<RemotePage<Record>>;

    /// Like [`fetch_page`](Self::fetch_page) but returns identifiers only.
    async fn fetch_id_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<RemotePage<String>>;

    /// Deletes the rows with the given ids. Missing ids are ignored.
    async fn delete_by_ids(&self, table: &str, ids: &[String]) -> SyncResult<()>;

    /// Inserts or replaces rows, matching on `conflict_key`.
    async fn upsert(&self, table: &str, rows: &[Record], conflict_key: &str) -> SyncResult<()>;
}
