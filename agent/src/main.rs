//! schoolbase sync agent
//!
//! Runs the local-to-cloud sync engine without the UI:
//! 1. `pull` hydrates the local snapshots from the remote tables
//! 2. `push` mirrors every synchronized collection to the remote tables
//! 3. `serve` exposes push status over HTTP
//!
//! Usage:
//!   schoolbase-agent --data-dir ./data pull
//!   schoolbase-agent --config agent.json serve --port 4010

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use schoolbase_agent::{
    build_coordinator, build_router, collection_infos, connect_remote, open_local, school_profile,
    AgentConfig,
};
use schoolbase_storage::SnapshotStore;
use schoolbase_sync::{RemoteStore, SyncCoordinator};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "schoolbase-agent")]
#[command(about = "schoolbase local-to-cloud sync agent")]
struct Args {
    /// Directory holding local snapshots (overrides the config file)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use an empty in-process remote store instead of PostgREST
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace local snapshots with non-empty remote tables
    Pull,
    /// Push every synchronized collection
    Push,
    /// Show the school profile and local record counts
    Status,
    /// Serve the status API
    Serve {
        /// HTTP port for the status API
        #[arg(short, long, default_value = "4010")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let mut config = match &args.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::from_env(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    let local = open_local(&config);
    let remote = connect_remote(&config, args.memory)?;
    info!(
        "Using {} snapshots in {} with {} remote",
        local.backend_name(),
        config.data_dir.display(),
        remote.provider_name()
    );

    let coordinator = Arc::new(build_coordinator(&config, local, remote));
    let loaded = coordinator.load_local().await;
    info!("Loaded {} local records", loaded);

    match args.command {
        Command::Pull => pull(&coordinator).await,
        Command::Push => push(&coordinator).await,
        Command::Status => {
            print_counts(&coordinator).await;
            Ok(())
        }
        Command::Serve { port } => serve(coordinator, port).await,
    }
}

async fn pull(coordinator: &SyncCoordinator) -> Result<()> {
    let report = coordinator.hydrate_from_remote().await?;
    for (name, rows) in &report.replaced {
        println!("  {:<24} {:>7} rows from remote", name, rows);
    }
    for name in &report.kept_local {
        println!("  {:<24} remote empty, kept local", name);
    }
    Ok(())
}

async fn push(coordinator: &SyncCoordinator) -> Result<()> {
    let summary = coordinator.push_all().await?;
    for report in &summary.completed {
        println!(
            "  {:<24} {:>7} upserted {:>7} deleted",
            report.table, report.upserted, report.deleted
        );
    }
    for name in &summary.deferred {
        println!("  {:<24} deferred", name);
    }
    for (name, error) in &summary.failed {
        println!("  {:<24} FAILED: {}", name, error);
    }
    if !summary.is_success() {
        bail!("{} collections failed to sync", summary.failed.len());
    }
    Ok(())
}

async fn print_counts(coordinator: &SyncCoordinator) {
    let school = school_profile(coordinator).await;
    println!("\n  {}", school.name);
    println!("  {}", school.motto);
    println!("\n  {:<24} {:>7}  {}", "COLLECTION", "RECORDS", "SYNC");
    for info in collection_infos(coordinator).await {
        let sync = if info.synchronized { "cloud" } else { "local" };
        println!("  {:<24} {:>7}  {}", info.name, info.records, sync);
    }
    println!();
}

async fn serve(coordinator: Arc<SyncCoordinator>, port: u16) -> Result<()> {
    if let Err(e) = coordinator.hydrate_from_remote().await {
        warn!("Starting with local state only: {}", e);
    }

    let app = build_router(coordinator);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Status API listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
