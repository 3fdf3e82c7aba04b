//! Per-collection push serialisation with last-write-wins coalescing.
//!
//! Each collection has a slot holding a `locked` flag and a single pending
//! snapshot. A push request either takes the lock and runs, or parks its
//! snapshot in the pending slot (replacing whatever was parked there) and
//! returns at once. When a push finishes, the runner drains the pending slot
//! before releasing the lock, so a burst of requests collapses into one
//! in-flight push plus at most one trailing push carrying the newest state.
//!
//! The check-and-set of `locked` and every pending-slot update happen inside
//! one mutex critical section; the mutex is never held across an await.
//! That lock-or-park step runs synchronously in the caller, so requests are
//! ordered by the order callers make them. The runner itself always lives in
//! a spawned task and never depends on the caller staying around.

use crate::config::SyncConfig;
use crate::push::{push_collection, PushReport};
use crate::remote::RemoteStore;
use chrono::{DateTime, Utc};
use schoolbase_types::Record;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Observable sync state of one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// A push is currently executing.
    pub in_flight: bool,
    /// A deferred snapshot is waiting for the current push to finish.
    pub has_pending: bool,
    /// Pushes attempted (successful or not).
    pub pushes: u64,
    /// Pushes that failed.
    pub failures: u64,
    /// Error of the most recent push, cleared by the next success.
    pub last_error: Option<String>,
    /// Completion time of the most recent successful push.
    pub last_pushed_at: Option<DateTime<Utc>>,
}

/// Result of a push request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// A push was already running; the snapshot was parked in the pending slot.
    Deferred,
    /// This request ran `runs` pushes back to back (its own snapshot followed
    /// by any snapshots parked meanwhile). `last` is the final push's result.
    Completed {
        runs: usize,
        last: Result<PushReport, String>,
    },
}

impl PushOutcome {
    /// True if the final push of this request failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, PushOutcome::Completed { last: Err(_), .. })
    }
}

#[derive(Debug, Default)]
struct Slot {
    locked: bool,
    pending: Option<Vec<Record>>,
    status: SyncStatus,
}

/// Serialises pushes per collection.
pub struct SyncScheduler {
    store: Arc<dyn RemoteStore>,
    config: SyncConfig,
    slots: Mutex<HashMap<String, Slot>>,
}

impl SyncScheduler {
    pub fn new(store: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Takes the lock for `collection`, or parks `snapshot` behind the push
    /// that holds it. Returns the snapshot back when the caller now owns the
    /// lock and must run it.
    fn enqueue(&self, collection: &str, snapshot: Vec<Record>) -> Option<Vec<Record>> {
        let mut slots = self.slots();
        let slot = slots.entry(collection.to_string()).or_default();
        if slot.locked {
            if slot.pending.replace(snapshot).is_some() {
                debug!("{}: pending snapshot superseded", collection);
            }
            slot.status.has_pending = true;
            return None;
        }
        slot.locked = true;
        slot.status.in_flight = true;
        Some(snapshot)
    }

    /// Pushes `snapshot`, then every snapshot parked meanwhile, and releases
    /// the lock once the pending slot is empty.
    async fn drain(self: Arc<Self>, collection: String, snapshot: Vec<Record>) -> PushOutcome {
        let mut held = HeldLock {
            scheduler: &self,
            collection: &collection,
            armed: true,
        };
        let mut snapshot = snapshot;
        let mut runs = 0;
        loop {
            runs += 1;
            let result =
                push_collection(self.store.as_ref(), &collection, &snapshot, &self.config).await;

            let mut slots = self.slots();
            let slot = slots.entry(collection.clone()).or_default();
            slot.status.pushes += 1;
            let last = match result {
                Ok(report) => {
                    slot.status.last_error = None;
                    slot.status.last_pushed_at = Some(Utc::now());
                    Ok(report)
                }
                Err(e) => {
                    warn!("Auto-sync failed for {}: {}", collection, e);
                    slot.status.failures += 1;
                    slot.status.last_error = Some(e.to_string());
                    Err(e.to_string())
                }
            };

            match slot.pending.take() {
                Some(next) => {
                    debug!("{}: pushing pending snapshot", collection);
                    slot.status.has_pending = false;
                    snapshot = next;
                }
                None => {
                    slot.locked = false;
                    slot.status.in_flight = false;
                    held.armed = false;
                    return PushOutcome::Completed { runs, last };
                }
            }
        }
    }

    /// Requests that `collection` be pushed with `snapshot`.
    ///
    /// Never returns an error: push failures are logged, recorded in
    /// [`SyncStatus`] and reported through [`PushOutcome::Completed`].
    /// Dropping the returned future does not cancel the push.
    pub async fn request_push(
        self: &Arc<Self>,
        collection: &str,
        snapshot: Vec<Record>,
    ) -> PushOutcome {
        match self.spawn_push(collection, snapshot).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Push task for {} did not finish: {}", collection, e);
                PushOutcome::Completed {
                    runs: 1,
                    last: Err(e.to_string()),
                }
            }
        }
    }

    /// Fire-and-forget variant of [`request_push`](Self::request_push).
    ///
    /// The lock-or-park step happens before this returns; only the push
    /// itself runs in the spawned task.
    pub fn spawn_push(
        self: &Arc<Self>,
        collection: impl Into<String>,
        snapshot: Vec<Record>,
    ) -> JoinHandle<PushOutcome> {
        let collection = collection.into();
        match self.enqueue(&collection, snapshot) {
            Some(snapshot) => tokio::spawn(Arc::clone(self).drain(collection, snapshot)),
            None => tokio::spawn(async { PushOutcome::Deferred }),
        }
    }

    /// Returns true while a push for `collection` is executing.
    pub fn is_in_flight(&self, collection: &str) -> bool {
        self.slots().get(collection).is_some_and(|s| s.locked)
    }

    /// Current status of one collection (default if it was never pushed).
    pub fn status(&self, collection: &str) -> SyncStatus {
        self.slots()
            .get(collection)
            .map(|s| s.status.clone())
            .unwrap_or_default()
    }

    /// Status of every collection that has been pushed at least once.
    pub fn statuses(&self) -> BTreeMap<String, SyncStatus> {
        self.slots()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.status.clone()))
            .collect()
    }
}

/// Releases a collection's lock if its runner stops before draining, handing
/// any parked snapshot to a fresh runner.
struct HeldLock<'a> {
    scheduler: &'a Arc<SyncScheduler>,
    collection: &'a String,
    armed: bool,
}

impl Drop for HeldLock<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("{}: push interrupted, releasing lock", self.collection);
        let runtime = Handle::try_current().ok();
        let next = {
            let mut slots = self.scheduler.slots();
            let slot = slots.entry(self.collection.clone()).or_default();
            slot.status.has_pending = false;
            let next = slot.pending.take().filter(|_| runtime.is_some());
            if next.is_none() {
                slot.locked = false;
                slot.status.in_flight = false;
            }
            next
        };
        if let (Some(next), Some(runtime)) = (next, runtime) {
            runtime.spawn(Arc::clone(self.scheduler).drain(self.collection.clone(), next));
        }
    }
}
