//! Shared fixtures for ledger integration tests

use chrono::NaiveDate;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::time::Duration;

use ledger::services::{DirSnapshotStorage, RetryPolicy};
use ledger::{Ledger, LedgerConfig, PayrollCalendar};
use shared::EmployeeRole;

/// A ledger wired to temp directories, kept alive with them
pub struct TestLedger {
    pub ledger: Ledger<DirSnapshotStorage>,
    pub store_path: PathBuf,
    pub snapshot_dir: PathBuf,
    _temp: TempDir,
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Build an un-started ledger over the given paths
pub fn build_ledger(store_path: PathBuf, snapshot_dir: PathBuf, bootstrap: bool) -> Ledger<DirSnapshotStorage> {
    let config = LedgerConfig {
        store_path,
        backup_interval: Duration::from_secs(3600),
        daily_backup_interval: Duration::from_secs(86400),
        bootstrap,
        retry: RetryPolicy::immediate(),
    };
    Ledger::new(DirSnapshotStorage::new(snapshot_dir), PayrollCalendar::standard(), config)
}

/// A ready, empty ledger bootstrapped in a fresh temp directory
pub async fn bootstrapped_ledger() -> TestLedger {
    let temp = TempDir::new().unwrap();
    let store_path = temp.path().join("data/ledger.json");
    let snapshot_dir = temp.path().join("snapshots");
    let ledger = build_ledger(store_path.clone(), snapshot_dir.clone(), true);
    ledger.startup().await.unwrap();
    TestLedger { ledger, store_path, snapshot_dir, _temp: temp }
}

/// A ready ledger seeded with the standard test crew
pub async fn seeded_ledger() -> TestLedger {
    let fixture = bootstrapped_ledger().await;
    seed_crew(&fixture.ledger).await;
    fixture
}

/// Seed the employees every scenario uses
pub async fn seed_crew(ledger: &Ledger<DirSnapshotStorage>) {
    ledger
        .add_employee("Doug Kinsey", vec!["Doug".to_string()], Some(30.0), Some(30.0), EmployeeRole::Hourly)
        .await
        .unwrap();
    ledger
        .add_employee("Boban Abbate", vec![], Some(42.5), Some(42.5), EmployeeRole::Hourly)
        .await
        .unwrap();
    ledger
        .add_employee("Sean Matthew", vec![], None, None, EmployeeRole::Hourly)
        .await
        .unwrap();
}
