//! Local snapshot storage for schoolbase.
//!
//! Every collection is cached on the device as one serialised JSON array so
//! the app keeps working offline and starts instantly. The remote table
//! store is the durable copy; this layer is best-effort.
//!
//! # Backends
//!
//! - [`FileSnapshotStore`]: one file per key in a data directory
//! - [`MemorySnapshotStore`]: process-local, used by tests and dry runs
//!
//! Both accept an optional byte quota so the browser's storage limit can be
//! reproduced and exercised.

mod error;
mod file;
mod memory;
mod profile;
mod snapshot;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use profile::SchoolProfile;
pub use snapshot::{load_collection, parse_collection, save_collection};
pub use store::SnapshotStore;
