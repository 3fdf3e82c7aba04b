//! Directory-backed snapshot store.
//!
//! One file per key (`<key>.json`) inside a single directory. Writes go to a
//! temporary file first and are renamed into place.

use crate::error::StorageResult;
use crate::store::{check_quota, entry_size, validate_key, SnapshotStore};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

const EXTENSION: &str = "json";

/// Snapshot store persisting each key as a file.
pub struct FileSnapshotStore {
    dir: PathBuf,
    quota_bytes: Option<u64>,
    /// Serialises quota check + write so concurrent sets cannot overshoot.
    write_lock: Mutex<()>,
}

impl FileSnapshotStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota_bytes: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Limits the total size of all entries.
    #[must_use]
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Returns the directory holding the snapshots.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{EXTENSION}"))
    }

    /// Total usage of every key except `exclude`.
    async fn usage_excluding(&self, exclude: &str) -> StorageResult<u64> {
        let mut used = 0;
        for key in self.keys().await? {
            if key == exclude {
                continue;
            }
            match fs::metadata(self.path_for(&key)).await {
                Ok(meta) => used += entry_size(&key, meta.len()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(used)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        match fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        validate_key(key)?;
        let _guard = self.write_lock.lock().await;

        if self.quota_bytes.is_some() {
            let used = self.usage_excluding(key).await?;
            check_quota(self.quota_bytes, key, value.len() as u64, used)?;
        }

        fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, value).await?;
        fs::rename(&tmp, self.path_for(key)).await?;

        debug!("Wrote {} bytes to {}", value.len(), key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
