//! Owns the in-memory collections and wires them to both stores.
//!
//! Startup is `load_local` (instant, offline) followed by
//! `hydrate_from_remote`. Every mutation runs under the collections write
//! lock and hands the new state to the [`ChangeObserver`].

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::fetch::fetch_collections;
use crate::observer::{ChangeObserver, ChangeOutcome};
use crate::push::PushReport;
use crate::remote::RemoteStore;
use crate::scheduler::{PushOutcome, SyncScheduler};
use futures::future::join_all;
use schoolbase_storage::{load_collection, SnapshotStore};
use schoolbase_types::{CollectionRegistry, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Result of hydrating from the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationReport {
    /// Collections whose local state was replaced, with their row counts.
    pub replaced: Vec<(String, usize)>,
    /// Collections left untouched because the remote table was empty.
    pub kept_local: Vec<String>,
}

/// Result of a full sync of every synchronized collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub completed: Vec<PushReport>,
    /// Collections whose snapshot was parked behind an in-flight push.
    pub deferred: Vec<String>,
    /// Collections whose push failed, with the error message.
    pub failed: Vec<(String, String)>,
}

impl SyncSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Clears the syncing flag however `push_all` exits.
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The application's collection state and its synchronisation.
pub struct SyncCoordinator {
    registry: Arc<CollectionRegistry>,
    local: Arc<dyn SnapshotStore>,
    scheduler: Arc<SyncScheduler>,
    observer: ChangeObserver,
    collections: RwLock<HashMap<String, Vec<Record>>>,
    defaults: HashMap<String, Vec<Record>>,
    syncing: AtomicBool,
}

impl SyncCoordinator {
    pub fn new(
        registry: CollectionRegistry,
        local: Arc<dyn SnapshotStore>,
        remote: Arc<dyn RemoteStore>,
        config: SyncConfig,
    ) -> Self {
        let registry = Arc::new(registry);
        let scheduler = Arc::new(SyncScheduler::new(remote, config));
        let observer = ChangeObserver::new(
            Arc::clone(&registry),
            Arc::clone(&local),
            Arc::clone(&scheduler),
        );
        Self {
            registry,
            local,
            scheduler,
            observer,
            collections: RwLock::new(HashMap::new()),
            defaults: HashMap::new(),
            syncing: AtomicBool::new(false),
        }
    }

    /// Seeds `collection` with `records` when no local snapshot exists.
    #[must_use]
    pub fn with_defaults(mut self, collection: impl Into<String>, records: Vec<Record>) -> Self {
        self.defaults.insert(collection.into(), records);
        self
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &Arc<SyncScheduler> {
        &self.scheduler
    }

    pub fn local(&self) -> &Arc<dyn SnapshotStore> {
        &self.local
    }

    /// Returns true while `push_all` is running.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    fn ensure_known(&self, collection: &str) -> SyncResult<()> {
        if self.registry.contains(collection) {
            Ok(())
        } else {
            Err(SyncError::UnknownCollection(collection.to_string()))
        }
    }

    /// Initialises every collection from its local snapshot.
    ///
    /// Returns the total number of records loaded.
    pub async fn load_local(&self) -> usize {
        let mut loaded = HashMap::with_capacity(self.registry.len());
        let mut total = 0;
        for spec in self.registry.iter() {
            let fallback = self.defaults.get(&spec.name).cloned().unwrap_or_default();
            let records = load_collection(self.local.as_ref(), &spec.local_key, fallback).await;
            total += records.len();
            loaded.insert(spec.name.clone(), records);
        }
        *self.collections.write().await = loaded;
        info!(
            "Loaded {} records across {} local collections",
            total,
            self.registry.len()
        );
        total
    }

    /// Pulls every synchronized collection from the remote store.
    ///
    /// All tables are fetched concurrently; if any fetch fails nothing is
    /// applied. A collection whose remote table is empty keeps its local
    /// state, so a fresh backend never wipes first-run data.
    pub async fn hydrate_from_remote(&self) -> SyncResult<HydrationReport> {
        let names = self.registry.synchronized().map(|spec| spec.name.as_str());
        let fetched = fetch_collections(
            self.scheduler.store().as_ref(),
            names,
            self.scheduler.config(),
        )
        .await
        .inspect_err(|e| warn!("Fetch error: {}", e))?;

        let mut report = HydrationReport::default();
        let mut collections = self.collections.write().await;
        for (name, rows) in fetched {
            if rows.is_empty() {
                report.kept_local.push(name);
                continue;
            }
            if let Some(spec) = self.registry.get(&name) {
                self.observer.save_local(&spec.local_key, &rows).await;
            }
            report.replaced.push((name.clone(), rows.len()));
            collections.insert(name, rows);
        }

        info!(
            "Hydrated {} collections from remote, kept {} local",
            report.replaced.len(),
            report.kept_local.len()
        );
        Ok(report)
    }

    /// Current local state of `collection`.
    pub async fn records(&self, collection: &str) -> SyncResult<Vec<Record>> {
        self.ensure_known(collection)?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    /// Record counts in registry order.
    pub async fn counts(&self) -> Vec<(String, usize)> {
        let collections = self.collections.read().await;
        self.registry
            .iter()
            .map(|spec| {
                let count = collections.get(&spec.name).map_or(0, Vec::len);
                (spec.name.clone(), count)
            })
            .collect()
    }

    /// Applies `change` to the current state of `collection` and propagates
    /// the result.
    ///
    /// The write lock is held from read to propagation, so concurrent
    /// mutations never start from the same base and their snapshots reach
    /// the stores and the scheduler in mutation order.
    async fn mutate<F>(&self, collection: &str, change: F) -> SyncResult<ChangeOutcome>
    where
        F: FnOnce(&mut Vec<Record>),
    {
        self.ensure_known(collection)?;
        let mut collections = self.collections.write().await;
        let mut records = collections.get(collection).cloned().unwrap_or_default();
        change(&mut records);
        let outcome = self.observer.on_change(collection, &records).await?;
        collections.insert(collection.to_string(), records);
        Ok(outcome)
    }

    /// Replaces the local state of `collection` and propagates the change.
    pub async fn update(&self, collection: &str, records: Vec<Record>) -> SyncResult<ChangeOutcome> {
        self.mutate(collection, |current| *current = records).await
    }

    /// Inserts `record`, or replaces the record with the same id in place.
    pub async fn upsert_record(&self, collection: &str, record: Record) -> SyncResult<ChangeOutcome> {
        self.mutate(collection, |records| {
            match records.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
        })
        .await
    }

    /// Removes the record with `id`, if present.
    pub async fn remove_record(&self, collection: &str, id: &str) -> SyncResult<ChangeOutcome> {
        self.mutate(collection, |records| records.retain(|r| r.id() != id))
            .await
    }

    /// Pushes every synchronized collection concurrently.
    ///
    /// Pushes go through the scheduler, so a collection that already has a
    /// push in flight gets its snapshot parked instead of pushed twice.
    pub async fn push_all(&self) -> SyncResult<SyncSummary> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SyncError::AlreadySyncing);
        }
        let _guard = SyncingGuard(&self.syncing);

        let snapshots: Vec<(String, Vec<Record>)> = {
            let collections = self.collections.read().await;
            self.registry
                .synchronized()
                .map(|spec| {
                    let records = collections.get(&spec.name).cloned().unwrap_or_default();
                    (spec.name.clone(), records)
                })
                .collect()
        };

        let outcomes = join_all(snapshots.into_iter().map(|(name, records)| async move {
            let outcome = self.scheduler.request_push(&name, records).await;
            (name, outcome)
        }))
        .await;

        let mut summary = SyncSummary::default();
        for (name, outcome) in outcomes {
            match outcome {
                PushOutcome::Deferred => summary.deferred.push(name),
                PushOutcome::Completed { last: Ok(report), .. } => summary.completed.push(report),
                PushOutcome::Completed { last: Err(e), .. } => summary.failed.push((name, e)),
            }
        }

        if summary.is_success() {
            info!("Sync complete: {} collections pushed", summary.completed.len());
        } else {
            warn!("Sync finished with {} failed collections", summary.failed.len());
        }
        Ok(summary)
    }
}
