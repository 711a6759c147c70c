//! Time-entry ledger core
//!
//! Records hourly labor against customers, routes entries through a
//! weekly approval workflow, computes payroll on a Wednesday–Tuesday
//! week and a 4-4-5 fiscal calendar, and keeps the data alive across
//! restarts with snapshot backups, verified cold-start restore, and
//! reconciliation against an external source of truth.

pub mod core;
pub mod error;
pub mod ledger;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use crate::core::{DomainStore, PayrollCalendar, ReconciliationReport, WeekPayroll};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{CloseMonthReport, HealthReport, ImportEntry, ImportReport, Ledger, LedgerConfig};
pub use traits::{SnapshotMeta, SnapshotStorage};
