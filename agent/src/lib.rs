//! Shared types and HTTP API for the schoolbase sync agent.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use schoolbase_storage::{FileSnapshotStore, SchoolProfile, SnapshotStore};
use schoolbase_sync::{
    MemoryRemoteStore, PostgrestConfig, PostgrestStore, RemoteStore, SyncConfig, SyncCoordinator,
    SyncError, SyncStatus, SyncSummary,
};
use schoolbase_types::CollectionRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Agent settings, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Directory holding the local collection snapshots.
    pub data_dir: PathBuf,
    pub remote: PostgrestConfig,
    pub sync: SyncConfig,
    /// Size limit for the local snapshot store.
    pub local_quota_bytes: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("schoolbase-data"),
            remote: PostgrestConfig::default(),
            sync: SyncConfig::default(),
            local_quota_bytes: None,
        }
    }
}

impl AgentConfig {
    /// Defaults with the remote connection taken from the environment.
    pub fn from_env() -> Self {
        Self {
            remote: PostgrestConfig::from_env(),
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.sync.validate()?;
        Ok(config)
    }
}

/// Opens the file-backed snapshot store under `data_dir`.
pub fn open_local(config: &AgentConfig) -> Arc<dyn SnapshotStore> {
    let store = FileSnapshotStore::new(&config.data_dir);
    match config.local_quota_bytes {
        Some(quota) => Arc::new(store.with_quota(quota)),
        None => Arc::new(store),
    }
}

/// Connects to the configured PostgREST backend, or an empty in-process
/// store when `in_memory` is set.
pub fn connect_remote(config: &AgentConfig, in_memory: bool) -> Result<Arc<dyn RemoteStore>> {
    if in_memory {
        return Ok(Arc::new(MemoryRemoteStore::new()));
    }
    config.remote.validate()?;
    let store = PostgrestStore::new(config.remote.clone())
        .context("Failed to build PostgREST client")?;
    Ok(Arc::new(store))
}

/// Builds a coordinator over the full school registry.
pub fn build_coordinator(
    config: &AgentConfig,
    local: Arc<dyn SnapshotStore>,
    remote: Arc<dyn RemoteStore>,
) -> SyncCoordinator {
    SyncCoordinator::new(
        CollectionRegistry::school(),
        local,
        remote,
        config.sync.clone(),
    )
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub local_key: String,
    pub synchronized: bool,
    pub records: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StatusResponse {
    pub school: SchoolProfile,
    pub provider: String,
    pub syncing: bool,
    pub collections: BTreeMap<String, SyncStatus>,
}

/// Local record counts for every collection, in registry order.
pub async fn collection_infos(coordinator: &SyncCoordinator) -> Vec<CollectionInfo> {
    let counts: BTreeMap<String, usize> = coordinator.counts().await.into_iter().collect();
    coordinator
        .registry()
        .iter()
        .map(|spec| CollectionInfo {
            name: spec.name.clone(),
            local_key: spec.local_key.clone(),
            synchronized: spec.synchronized,
            records: counts.get(&spec.name).copied().unwrap_or(0),
        })
        .collect()
}

/// Branding from the local store, or the defaults if it cannot be read.
pub async fn school_profile(coordinator: &SyncCoordinator) -> SchoolProfile {
    SchoolProfile::load(coordinator.local().as_ref())
        .await
        .unwrap_or_else(|e| {
            warn!("Failed to read school profile: {}", e);
            SchoolProfile::default()
        })
}

/// Push status of every synchronized collection.
pub async fn status_report(coordinator: &SyncCoordinator) -> StatusResponse {
    let school = school_profile(coordinator).await;
    let scheduler = coordinator.scheduler();
    let collections = coordinator
        .registry()
        .synchronized()
        .map(|spec| (spec.name.clone(), scheduler.status(&spec.name)))
        .collect();
    StatusResponse {
        school,
        provider: scheduler.store().provider_name().to_string(),
        syncing: coordinator.is_syncing(),
        collections,
    }
}

async fn status_handler(State(coordinator): State<Arc<SyncCoordinator>>) -> Json<StatusResponse> {
    Json(status_report(&coordinator).await)
}

async fn collections_handler(
    State(coordinator): State<Arc<SyncCoordinator>>,
) -> Json<Vec<CollectionInfo>> {
    Json(collection_infos(&coordinator).await)
}

async fn sync_handler(
    State(coordinator): State<Arc<SyncCoordinator>>,
) -> Result<Json<SyncSummary>, (StatusCode, String)> {
    match coordinator.push_all().await {
        Ok(summary) => Ok(Json(summary)),
        Err(e @ SyncError::AlreadySyncing) => Err((StatusCode::CONFLICT, e.to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Build the HTTP API router over a loaded coordinator.
pub fn build_router(coordinator: Arc<SyncCoordinator>) -> Router {
    Router::new()
        .route("/api/v1/status", get(status_handler))
        .route("/api/v1/collections", get(collections_handler))
        .route("/api/v1/sync", post(sync_handler))
        .with_state(coordinator)
}
