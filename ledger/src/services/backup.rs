//! Snapshot backup with the non-empty guard
//!
//! Backups run on a timer independent of request handling. Before any
//! upload the local store must be provably non-empty and internally
//! consistent; otherwise the upload is skipped so a known-good remote
//! snapshot is never overwritten by an empty or partial one.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::core::DomainStore;
use crate::error::{LedgerError, LedgerResult};
use crate::services::snapshot_storage::snapshot_key;
use crate::services::store_file::StoreFile;
use crate::traits::SnapshotStorage;
use tracing::{info, warn};

/// Which snapshot series an upload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Frequent snapshots taken by the backup timer
    Periodic,
    /// Daily archival snapshots; the restore fallback of last resort
    Daily,
}

impl SnapshotKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            SnapshotKind::Periodic => "periodic",
            SnapshotKind::Daily => "daily",
        }
    }
}

/// Uploads verified store snapshots to remote storage
pub struct BackupService<S> {
    storage: Arc<S>,
}

impl<S: SnapshotStorage> BackupService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Point-in-time copy with the guard applied. Synchronous so callers
    /// can run it under a short-lived store lock; the upload happens
    /// afterwards with no lock held. Returns `BackupSkipped` when the
    /// guard refuses.
    pub fn prepare(&self, store: &DomainStore) -> LedgerResult<Vec<u8>> {
        if !store.has_core_rows() {
            let counts = store.row_counts();
            return Err(LedgerError::BackupSkipped {
                reason: format!(
                    "core tables not provably non-empty (employees={}, entries={})",
                    counts.employees, counts.entries
                ),
            });
        }
        let integrity = store.integrity_errors();
        if !integrity.is_empty() {
            warn!("⚠️ Backup guard found {} integrity errors", integrity.len());
            return Err(LedgerError::BackupSkipped {
                reason: format!("store failed consistency check: {}", integrity.join("; ")),
            });
        }

        // A failed consistent-copy also skips rather than uploading junk
        StoreFile::encode(store).map_err(|e| LedgerError::BackupSkipped {
            reason: format!("consistent copy failed: {e}"),
        })
    }

    /// Upload an already-prepared snapshot blob
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        kind: SnapshotKind,
        now: DateTime<Utc>,
    ) -> LedgerResult<String> {
        let key = snapshot_key(kind.prefix(), now);
        self.storage.put(&key, bytes).await?;
        info!("📤 Backup uploaded: {}", key);
        Ok(key)
    }

    /// Guard, copy, and upload in one call. Skips are non-fatal: the
    /// caller logs them and counts them in health.
    pub async fn backup_now(
        &self,
        store: &DomainStore,
        kind: SnapshotKind,
        now: DateTime<Utc>,
    ) -> LedgerResult<String> {
        let bytes = self.prepare(store)?;
        self.upload(bytes, kind, now).await
    }
}
