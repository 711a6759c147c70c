//! Ledger-specific error types

use shared::{EntryId, EntryStatus, FiscalMonthId, SharedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Entry {entry_id} is locked ({status}); reopen the week to edit it")]
    EntryLocked { entry_id: EntryId, status: EntryStatus },

    #[error("No bill rate configured for employee '{employee}' on customer '{customer}'")]
    NoRateConfigured { employee: String, customer: String },

    #[error("No entries to submit for employee '{employee}' in week starting {week_start}")]
    EmptyWeek { employee: String, week_start: chrono::NaiveDate },

    #[error("Fiscal month {month} is closed")]
    MonthClosed { month: FiscalMonthId },

    #[error("Fiscal month {month} has {count} entries outside APPROVED status")]
    UnapprovedEntries { month: FiscalMonthId, count: u32 },

    #[error("Unknown employee: {name}")]
    UnknownEmployee { name: String },

    #[error("Unknown time entry: {entry_id}")]
    UnknownEntry { entry_id: EntryId },

    #[error("Service is not ready to accept requests (startup restore incomplete)")]
    ServiceNotReady,

    #[error("Restore failed: {message}")]
    RestoreFailed { message: String },

    #[error("Backup skipped: {reason}")]
    BackupSkipped { reason: String },

    #[error("Snapshot storage operation failed: {operation}: {message}")]
    StorageError { operation: String, message: String },

    #[error("Shared component error")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl LedgerError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation { message: message.into() }
    }

    /// Shorthand for a storage failure
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::StorageError {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
