//! Main ledger service implementation
//!
//! `Ledger` is the facade the (out-of-scope) transport layer calls into.
//! It owns the store handle for the process lifetime: constructed at
//! startup after restore + verification, closed at shutdown. Writes are
//! serialized through a single `RwLock`; multi-row operations mutate the
//! store under one write guard so partial application cannot be observed
//! or persisted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

use shared::{logging, Employee, EmployeeRole, EntryId, EntryStatus, FiscalMonthId, TimeEntry, WeekSubmission};

use crate::core::calendar::{parse_day_name, week_start_of, PayrollCalendar};
use crate::core::payroll::compute_week;
use crate::core::reconcile::{reconcile, ExpectedHours, ReconciliationReport};
use crate::core::store::{DomainStore, MergeStats, RowCounts};
use crate::core::WeekPayroll;
use crate::error::{LedgerError, LedgerResult};
use crate::services::backup::{BackupService, SnapshotKind};
use crate::services::restore::{verify_store, RestoreService, RetryPolicy};
use crate::services::store_file::StoreFile;
use crate::traits::SnapshotStorage;

/// Ledger service configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Path of the local persisted store document
    pub store_path: PathBuf,
    /// Interval between periodic snapshot uploads
    pub backup_interval: Duration,
    /// Interval between daily archival snapshot uploads
    pub daily_backup_interval: Duration,
    /// Permit first boot with an empty store when no snapshot exists
    /// anywhere. Without this, an empty store after all restore fallbacks
    /// is fatal.
    pub bootstrap: bool,
    /// Retry policy for restore-time storage operations
    pub retry: RetryPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./data/ledger.json"),
            backup_interval: Duration::from_secs(15 * 60),
            daily_backup_interval: Duration::from_secs(24 * 60 * 60),
            bootstrap: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// One row of an admin bulk import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEntry {
    pub employee: String,
    pub customer: String,
    pub work_date: NaiveDate,
    pub hours: f64,
    #[serde(default)]
    pub notes: String,
}

/// Result of an admin bulk import
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: u32,
    pub customers_created: u32,
}

/// Result of closing a fiscal month
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CloseMonthReport {
    pub fiscal_month: FiscalMonthId,
    pub archived_rows: u32,
    pub purged_entries: u32,
}

/// Operational health snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub ready: bool,
    pub counts: RowCounts,
    pub last_backup_at: Option<DateTime<Utc>>,
    pub backups_skipped: u64,
    pub restore_source: Option<String>,
}

#[derive(Debug, Default)]
struct HealthCounters {
    last_backup_at: Option<DateTime<Utc>>,
    backups_skipped: u64,
    restore_source: Option<String>,
}

/// The time-entry ledger service
pub struct Ledger<S: SnapshotStorage + 'static> {
    /// The store handle; exists for the process lifetime once startup
    /// completes
    store: Arc<RwLock<DomainStore>>,
    calendar: PayrollCalendar,
    store_file: StoreFile,
    backup: BackupService<S>,
    restore: RestoreService<S>,
    config: LedgerConfig,

    /// Startup gate: no operation runs until restore + verification pass
    ready: AtomicBool,
    /// Close-month is explicitly non-concurrent with itself
    close_lock: Mutex<()>,
    health: std::sync::Mutex<HealthCounters>,

    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl<S: SnapshotStorage + 'static> Ledger<S> {
    /// Create the service with injected snapshot storage. The store is
    /// empty and not ready until `startup` succeeds.
    pub fn new(storage: S, calendar: PayrollCalendar, config: LedgerConfig) -> Self {
        let storage = Arc::new(storage);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Self {
            store: Arc::new(RwLock::new(DomainStore::new())),
            calendar,
            store_file: StoreFile::new(config.store_path.clone()),
            backup: BackupService::new(storage.clone()),
            restore: RestoreService::with_policy(storage, config.retry),
            config,
            ready: AtomicBool::new(false),
            close_lock: Mutex::new(()),
            health: std::sync::Mutex::new(HealthCounters::default()),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn calendar(&self) -> &PayrollCalendar {
        &self.calendar
    }

    pub fn get_shutdown_sender(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    // Startup gate

    /// Cold-start restore. Must complete before any read or write is
    /// served; this ordering is a hard guarantee, not an optimization.
    pub async fn startup(&self) -> LedgerResult<()> {
        info!("🚀 Ledger cold start: opening local store at {}", self.store_file.path().display());

        // Try the local persisted store first
        let loaded = match self.store_file.load().await {
            Ok(found) => found,
            Err(e) => {
                warn!("⚠️ Local store unreadable ({}); treating as absent", e);
                None
            }
        };

        let local = match loaded {
            Some(store) if verify_store(&store).is_ok() => {
                let counts = store.row_counts();
                self.install_store(store, "local").await?;
                logging::log_success(&format!(
                    "Ledger ready from local store ({} employees, {} entries)",
                    counts.employees, counts.entries
                ));
                return Ok(());
            }
            Some(store) => {
                warn!("⚠️ Local store failed verification; falling back to remote restore");
                Some(store)
            }
            None => {
                info!("📥 No local store; restoring from remote snapshots");
                None
            }
        };

        // Remote restore with fallback, merged over whatever partial
        // local/seed data exists so a re-run never duplicates rows
        match self.restore.restore().await {
            Ok((snapshot, source)) => {
                let mut base = local.unwrap_or_default();
                let stats = base.merge_from(snapshot);
                verify_store(&base).map_err(|message| LedgerError::RestoreFailed { message })?;
                info!(
                    "📥 Merge-restore from {}: +{} employees, +{} customers, +{} entries",
                    source.key(),
                    stats.employees_added,
                    stats.customers_added,
                    stats.entries_added
                );
                self.install_store(base, source.key()).await?;
                logging::log_success("Ledger ready after remote restore");
                Ok(())
            }
            Err(e) => {
                if self.config.bootstrap {
                    // Explicitly requested first boot: an empty store is
                    // allowed, loudly
                    warn!("⚠️ Bootstrap mode: starting with an empty store ({})", e);
                    self.install_store(local.unwrap_or_default(), "bootstrap").await?;
                    Ok(())
                } else {
                    error!("❌ Cold-start restore failed; refusing to serve: {}", e);
                    Err(e)
                }
            }
        }
    }

    async fn install_store(&self, store: DomainStore, source: &str) -> LedgerResult<()> {
        self.store_file.save(&store).await?;
        *self.store.write().await = store;
        if let Ok(mut health) = self.health.lock() {
            health.restore_source = Some(source.to_string());
        }
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn ensure_ready(&self) -> LedgerResult<()> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::ServiceNotReady)
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    // Main loop

    /// Run the backup timers until shutdown. Request handling happens on
    /// other tasks through the service methods; nothing here blocks it.
    pub async fn run(&mut self) -> LedgerResult<()> {
        self.ensure_ready()?;
        let mut periodic = interval(self.config.backup_interval);
        let mut daily = interval(self.config.daily_backup_interval);
        // Both intervals fire immediately once; the startup backup is
        // deliberate
        info!(
            "⏱️ Backup timers armed (periodic every {}s, daily every {}s)",
            self.config.backup_interval.as_secs(),
            self.config.daily_backup_interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = periodic.tick() => {
                    self.run_backup(SnapshotKind::Periodic).await;
                }
                _ = daily.tick() => {
                    self.run_backup(SnapshotKind::Daily).await;
                }
                _ = self.shutdown_rx.recv() => {
                    logging::log_shutdown("shutdown signal received");
                    break;
                }
            }
        }

        // Final snapshot on the way out; a skip here is fine
        self.run_backup(SnapshotKind::Periodic).await;
        Ok(())
    }

    async fn run_backup(&self, kind: SnapshotKind) {
        match self.trigger_backup(kind).await {
            Ok(key) => info!("📤 {} backup complete: {}", kind.prefix(), key),
            Err(LedgerError::BackupSkipped { reason }) => {
                warn!("⚠️ {} backup skipped: {}", kind.prefix(), reason);
            }
            Err(e) => {
                logging::log_error(&format!("{} backup", kind.prefix()), &e);
            }
        }
    }

    /// Take a point-in-time copy under the read lock, then upload without
    /// holding any lock. Also the admin-triggered backup entry point.
    pub async fn trigger_backup(&self, kind: SnapshotKind) -> LedgerResult<String> {
        self.ensure_ready()?;
        let prepared = {
            let store = self.store.read().await;
            self.backup.prepare(&store)
        };
        let bytes = match prepared {
            Ok(bytes) => bytes,
            Err(e) => {
                if matches!(e, LedgerError::BackupSkipped { .. }) {
                    if let Ok(mut health) = self.health.lock() {
                        health.backups_skipped += 1;
                    }
                }
                return Err(e);
            }
        };

        let key = self.backup.upload(bytes, kind, Utc::now()).await?;
        if let Ok(mut health) = self.health.lock() {
            health.last_backup_at = Some(Utc::now());
        }
        Ok(key)
    }

    /// Admin-triggered merge-restore: fetch the best remote snapshot and
    /// merge it into the live store. Idempotent; safe to retry.
    pub async fn merge_restore(&self) -> LedgerResult<MergeStats> {
        self.ensure_ready()?;
        let (snapshot, source) = self.restore.restore().await?;
        let mut store = self.store.write().await;
        let stats = store.merge_from(snapshot);
        self.store_file.save(&store).await?;
        info!(
            "📥 Merge-restore from {}: +{} entries, {} updated",
            source.key(),
            stats.entries_added,
            stats.entries_updated
        );
        Ok(stats)
    }

    // Seeding / admin setup

    pub async fn add_employee(
        &self,
        name: &str,
        aliases: Vec<String>,
        default_bill_rate: Option<f64>,
        default_pay_rate: Option<f64>,
        role: EmployeeRole,
    ) -> LedgerResult<Employee> {
        self.ensure_ready()?;
        let mut store = self.store.write().await;
        let employee = store.add_employee(name, aliases, default_bill_rate, default_pay_rate, role)?;
        self.store_file.save(&store).await?;
        Ok(employee)
    }

    pub async fn upsert_rate_override(
        &self,
        employee_name: &str,
        customer_name: &str,
        bill_rate: f64,
    ) -> LedgerResult<()> {
        self.ensure_ready()?;
        let mut store = self.store.write().await;
        let employee_id = store.require_employee(employee_name)?.id;
        let (customer, _) = store.find_or_create_customer(customer_name, None)?;
        store.upsert_rate_override(employee_id, customer.id, bill_rate)?;
        self.store_file.save(&store).await?;
        Ok(())
    }

    /// Resolve the effective bill rate for an (employee, customer) pair
    pub async fn resolve_bill_rate(
        &self,
        employee_name: &str,
        customer_name: &str,
    ) -> LedgerResult<f64> {
        self.ensure_ready()?;
        let store = self.store.read().await;
        let employee_id = store.require_employee(employee_name)?.id;
        let customer = store.find_customer(customer_name).ok_or_else(|| {
            LedgerError::validation(format!("unknown customer: {customer_name}"))
        })?;
        store.resolve_bill_rate(employee_id, customer.id)
    }

    // Time entry operations

    /// Upsert one entry on its natural key. Unknown customer names are
    /// created implicitly; unknown employees are an error.
    pub async fn record_entry(
        &self,
        employee_name: &str,
        customer_name: &str,
        work_date: NaiveDate,
        hours: f64,
        notes: &str,
    ) -> LedgerResult<TimeEntry> {
        self.ensure_ready()?;
        let mut store = self.store.write().await;
        let employee_id = store.require_employee(employee_name)?.id;
        let (customer, _) = store.find_or_create_customer(customer_name, None)?;
        let entry = store.upsert_time_entry(
            &self.calendar,
            employee_id,
            customer.id,
            work_date,
            hours,
            notes,
            Utc::now(),
        )?;
        self.store_file.save(&store).await?;
        Ok(entry)
    }

    /// Entry produced from spoken input. The spoken day name always maps
    /// into the current payroll week, whatever day was said.
    pub async fn record_spoken_entry(
        &self,
        employee_name: &str,
        customer_name: &str,
        spoken_day: &str,
        hours: f64,
        notes: &str,
    ) -> LedgerResult<TimeEntry> {
        let day = parse_day_name(spoken_day)?;
        let work_date = self.calendar.date_for_spoken_day(Utc::now().date_naive(), day);
        self.record_entry(employee_name, customer_name, work_date, hours, notes).await
    }

    /// Admin bulk import. The whole batch is validated and applied as one
    /// atomic mutation; on any failure the store is untouched.
    pub async fn import_entries(
        &self,
        rows: &[ImportEntry],
        default_status: EntryStatus,
    ) -> LedgerResult<ImportReport> {
        self.ensure_ready()?;
        let mut store = self.store.write().await;

        let checkpoint = store.clone();
        let result = Self::apply_import(&mut store, &self.calendar, rows, default_status);
        match result {
            Ok(report) => {
                if let Err(e) = self.store_file.save(&store).await {
                    *store = checkpoint;
                    return Err(e);
                }
                Ok(report)
            }
            Err(e) => {
                *store = checkpoint;
                Err(e)
            }
        }
    }

    fn apply_import(
        store: &mut DomainStore,
        calendar: &PayrollCalendar,
        rows: &[ImportEntry],
        default_status: EntryStatus,
    ) -> LedgerResult<ImportReport> {
        let now = Utc::now();
        let mut imported = 0;
        let mut customers_created = 0;
        for row in rows {
            let employee_id = store.require_employee(&row.employee)?.id;
            let (customer, created) = store.find_or_create_customer(&row.customer, None)?;
            if created {
                customers_created += 1;
            }
            let entry = store.upsert_time_entry(
                calendar,
                employee_id,
                customer.id,
                row.work_date,
                row.hours,
                &row.notes,
                now,
            )?;
            if default_status != EntryStatus::Draft {
                store.force_entry_status(entry.id, default_status, now)?;
            }
            imported += 1;
        }
        Ok(ImportReport { imported, customers_created })
    }

    // Week state machine

    pub async fn submit_week(
        &self,
        employee_name: &str,
        week_start: NaiveDate,
        comment: Option<String>,
    ) -> LedgerResult<WeekSubmission> {
        self.ensure_ready()?;
        let mut store = self.store.write().await;
        let employee_id = store.require_employee(employee_name)?.id;
        let submission = store.submit_week(employee_id, week_start, comment, Utc::now())?;
        self.store_file.save(&store).await?;
        info!(
            "📋 Week {} submitted for {} ({} entries)",
            submission.week_start, employee_name, submission.entry_count
        );
        Ok(submission)
    }

    pub async fn approve_entries(&self, ids: &[EntryId]) -> LedgerResult<u32> {
        self.ensure_ready()?;
        let mut store = self.store.write().await;
        let approved = store.approve_entries(ids, Utc::now())?;
        self.store_file.save(&store).await?;
        Ok(approved)
    }

    pub async fn reopen_week(&self, employee_name: &str, week_start: NaiveDate) -> LedgerResult<u32> {
        self.ensure_ready()?;
        let mut store = self.store.write().await;
        let employee_id = store.require_employee(employee_name)?.id;
        let reopened = store.reopen_week(&self.calendar, employee_id, week_start, Utc::now())?;
        self.store_file.save(&store).await?;
        info!("📋 Week {} reopened for {} ({} entries back to DRAFT)", week_start_of(week_start), employee_name, reopened);
        Ok(reopened)
    }

    // Payroll & reporting

    /// Read-only payroll preview for one employee's week
    pub async fn week_payroll(&self, employee_name: &str, week_start: NaiveDate) -> LedgerResult<WeekPayroll> {
        self.ensure_ready()?;
        let store = self.store.read().await;
        let employee_id = store.require_employee(employee_name)?.id;
        let start = week_start_of(week_start);
        let lines = store.week_pay_lines(employee_id, start)?;
        Ok(compute_week(start, &lines))
    }

    /// Close a fiscal month: durably archive per-employee/per-customer
    /// aggregates, then purge the live entries. Two-phase: the purge
    /// never runs unless the archive write reached disk.
    pub async fn close_month(
        &self,
        month: FiscalMonthId,
        force: bool,
        confirm: bool,
    ) -> LedgerResult<CloseMonthReport> {
        self.ensure_ready()?;
        if !confirm {
            return Err(LedgerError::validation(
                "closing a month is destructive and requires explicit confirmation",
            ));
        }
        // One close at a time, ever
        let _close_guard = self.close_lock.lock().await;
        let mut store = self.store.write().await;

        let rows = store.month_close_rows(&self.calendar, month, force, Utc::now())?;
        let archived_rows = rows.len() as u32;

        // Phase 1: archive rows must be durable before anything is purged
        store.write_month_archive(month, rows);
        if let Err(e) = self.store_file.save(&store).await {
            store.rollback_month_archive(month);
            error!("❌ Close-month archive write failed for {}; purge aborted: {}", month, e);
            return Err(e);
        }

        // Phase 2: purge the live rows
        let purged_entries = store.purge_month(&self.calendar, month);
        self.store_file.save(&store).await?;
        info!(
            "🗄️ Closed fiscal month {}: {} archive rows, {} entries purged",
            month, archived_rows, purged_entries
        );
        Ok(CloseMonthReport { fiscal_month: month, archived_rows, purged_entries })
    }

    /// Run reconciliation over a date range against an authoritative
    /// dataset. Read-only; findings are data, not mutations.
    pub async fn reconcile_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        expected: &[ExpectedHours],
    ) -> LedgerResult<ReconciliationReport> {
        self.ensure_ready()?;
        let store = self.store.read().await;
        let live = store.aggregate_hours(start, end);
        let meals = store.meal_hours_by_day(start, end);
        Ok(reconcile(start, end, &live, expected, &meals))
    }

    /// Reconcile one fiscal month's range
    pub async fn reconcile_month(
        &self,
        month: FiscalMonthId,
        expected: &[ExpectedHours],
    ) -> LedgerResult<ReconciliationReport> {
        let (start, end) = self.calendar.month_range(month);
        self.reconcile_range(start, end, expected).await
    }

    // Introspection

    pub async fn entry(&self, id: EntryId) -> LedgerResult<Option<TimeEntry>> {
        self.ensure_ready()?;
        let store = self.store.read().await;
        Ok(store.entry(id).cloned())
    }

    pub async fn entries_for_week(
        &self,
        employee_name: &str,
        week_start: NaiveDate,
    ) -> LedgerResult<Vec<TimeEntry>> {
        self.ensure_ready()?;
        let store = self.store.read().await;
        let employee_id = store.require_employee(employee_name)?.id;
        Ok(store
            .entries_for_week(employee_id, week_start)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Health is readable even before the startup gate opens
    pub async fn health(&self) -> HealthReport {
        let counts = self.store.read().await.row_counts();
        let (last_backup_at, backups_skipped, restore_source) = match self.health.lock() {
            Ok(health) => (health.last_backup_at, health.backups_skipped, health.restore_source.clone()),
            Err(_) => (None, 0, None),
        };
        HealthReport {
            ready: self.is_ready(),
            counts,
            last_backup_at,
            backups_skipped,
            restore_source,
        }
    }
}
