//! Main entry point for the ledger service binary
//!
//! Wires the real service implementations together: local store document,
//! directory-backed snapshot storage, the startup restore gate, and the
//! backup timer loop.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tokio::time::Duration;

use ledger::services::DirSnapshotStorage;
use ledger::{Ledger, LedgerConfig, PayrollCalendar};
use shared::logging;

/// Time-entry ledger service
#[derive(Parser)]
#[command(name = "ledger")]
#[command(about = "Time-entry ledger with weekly approvals, payroll, and snapshot durability")]
pub struct Args {
    /// Path of the local persisted store document
    #[arg(long, default_value = "./data/ledger.json")]
    pub store: PathBuf,

    /// Directory (or mounted bucket) holding remote snapshots
    #[arg(long, default_value = "./data/snapshots")]
    pub snapshots: PathBuf,

    /// Seconds between periodic snapshot uploads
    #[arg(long, default_value = "900")]
    pub backup_interval_secs: u64,

    /// Seconds between daily archival snapshot uploads
    #[arg(long, default_value = "86400")]
    pub daily_backup_interval_secs: u64,

    /// Allow first boot with an empty store when no snapshot exists.
    /// Without this flag an unrestorable store is fatal.
    #[arg(long)]
    pub bootstrap: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    logging::init_tracing_with_level(Some(&args.log_level));
    logging::log_startup("ledger service");

    let storage = DirSnapshotStorage::new(args.snapshots.clone());
    let config = LedgerConfig {
        store_path: args.store.clone(),
        backup_interval: Duration::from_secs(args.backup_interval_secs),
        daily_backup_interval: Duration::from_secs(args.daily_backup_interval_secs),
        bootstrap: args.bootstrap,
        ..LedgerConfig::default()
    };

    let mut service = Ledger::new(storage, PayrollCalendar::standard(), config);

    // Hard ordering guarantee: nothing is served until restore and its
    // verification complete
    service
        .startup()
        .await
        .context("cold-start restore failed; refusing to serve traffic")?;

    // Set up graceful shutdown
    let shutdown_sender = service.get_shutdown_sender();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_shutdown("Received Ctrl+C signal");
                let _ = shutdown_sender.send(()).await;
            }
            Err(err) => {
                logging::log_error("Signal handling", &err);
            }
        }
    });

    // Run backup timers until shutdown
    service.run().await.context("ledger run loop failed")?;

    logging::log_success("Ledger stopped gracefully");
    Ok(())
}
