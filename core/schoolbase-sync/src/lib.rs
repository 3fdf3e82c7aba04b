//! Local-to-cloud reconciliation engine for schoolbase.
//!
//! Keeps each school collection (students, marks, fee payments, ...) mirrored
//! between the device and a remote multi-tenant table store.
//!
//! # Architecture
//!
//! The engine is generic over record shape: it only reads a record's `id`.
//!
//! ## Components
//!
//! - **Remote**: the [`RemoteStore`] contract, a PostgREST client and an
//!   in-memory store
//! - **Fetch**: paginated bulk reads used to hydrate state at startup
//! - **Push**: reconciliation that turns a remote table into an exact mirror
//!   of local state (deletes stale ids, upserts everything else)
//! - **Scheduler**: per-collection lock with last-write-wins coalescing
//! - **Observer**: local snapshot write + push request on every change
//! - **Coordinator**: owns the in-memory collections and ties it together
//!
//! ## Sync Process
//!
//! 1. **Load**: read every collection from the local snapshot store
//! 2. **Hydrate**: fetch all remote tables in parallel; non-empty results
//!    replace local state
//! 3. **Mutate**: each change is saved locally and scheduled for push
//! 4. **Push**: scan remote ids, delete the stale ones, upsert local records
//!
//! # Example
//!
//! ```
//! use schoolbase_storage::MemorySnapshotStore;
//! use schoolbase_sync::{MemoryRemoteStore, SyncConfig, SyncCoordinator};
//! use schoolbase_types::CollectionRegistry;
//! use std::sync::Arc;
//!
//! let coordinator = SyncCoordinator::new(
//!     CollectionRegistry::school(),
//!     Arc::new(MemorySnapshotStore::new()),
//!     Arc::new(MemoryRemoteStore::new()),
//!     SyncConfig::default(),
//! );
//! assert_eq!(coordinator.registry().len(), 21);
//! ```

mod config;
mod coordinator;
mod error;
pub mod fetch;
mod observer;
pub mod push;
pub mod remote;
mod scheduler;

pub use config::{
    SyncConfig, CONFLICT_KEY, DELETE_BATCH_SIZE, FETCH_PAGE_SIZE, UPSERT_BATCH_SIZE,
};
pub use coordinator::{HydrationReport, SyncCoordinator, SyncSummary};
pub use error::{SyncError, SyncResult};
pub use fetch::{fetch_collection, fetch_collections, fetch_remote_ids};
pub use observer::{ChangeObserver, ChangeOutcome};
pub use push::{push_collection, stale_ids, PushReport};
pub use remote::{
    MemoryRemoteStore, PostgrestConfig, PostgrestStore, RemoteOp, RemotePage, RemoteStore,
};
pub use scheduler::{PushOutcome, SyncScheduler, SyncStatus};
