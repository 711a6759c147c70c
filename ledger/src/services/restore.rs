//! Cold-start restore with retry, fallback, and verification
//!
//! On startup the service must not serve from an empty or silently wrong
//! store. Restore fetches the most recent periodic snapshot with retries
//! and exponential backoff; if that snapshot is empty or fails
//! verification it falls back to the daily archival series. Whatever is
//! restored is verified (non-empty core tables, referential integrity)
//! before the caller may mark the service ready.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::core::DomainStore;
use crate::error::{LedgerError, LedgerResult};
use crate::services::backup::SnapshotKind;
use crate::services::store_file::StoreFile;
use crate::traits::{SnapshotMeta, SnapshotStorage};
use tracing::{info, warn};

/// Backoff policy for storage operations during restore
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Exponential delay for the given zero-based attempt, with jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..100));
        exponential + jitter
    }

    /// A fast policy for tests
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }
}

/// Where a restored store came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreSource {
    Primary { key: String },
    DailyFallback { key: String },
}

impl RestoreSource {
    pub fn key(&self) -> &str {
        match self {
            RestoreSource::Primary { key } => key,
            RestoreSource::DailyFallback { key } => key,
        }
    }
}

/// Verify a restored store before it may serve traffic
pub fn verify_store(store: &DomainStore) -> Result<(), String> {
    if !store.has_core_rows() {
        let counts = store.row_counts();
        return Err(format!(
            "core tables empty after restore (employees={}, entries={})",
            counts.employees, counts.entries
        ));
    }
    let errors = store.integrity_errors();
    if !errors.is_empty() {
        return Err(format!("integrity check failed: {}", errors.join("; ")));
    }
    Ok(())
}

/// Restores the store from remote snapshots on cold start
pub struct RestoreService<S> {
    storage: Arc<S>,
    policy: RetryPolicy,
}

impl<S: SnapshotStorage> RestoreService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage, policy: RetryPolicy::default() }
    }

    pub fn with_policy(storage: Arc<S>, policy: RetryPolicy) -> Self {
        Self { storage, policy }
    }

    /// Restore from the primary series, falling back to the daily series.
    /// Exhausting every fallback is fatal for startup.
    pub async fn restore(&self) -> LedgerResult<(DomainStore, RestoreSource)> {
        match self.restore_from(SnapshotKind::Periodic).await {
            Ok(Some((key, store))) => {
                info!("📥 Restored from primary snapshot {}", key);
                return Ok((store, RestoreSource::Primary { key }));
            }
            Ok(None) => warn!("⚠️ No usable primary snapshot; falling back to daily series"),
            Err(e) => warn!("⚠️ Primary snapshot restore failed ({}); falling back to daily series", e),
        }

        match self.restore_from(SnapshotKind::Daily).await {
            Ok(Some((key, store))) => {
                info!("📥 Restored from daily archival snapshot {}", key);
                Ok((store, RestoreSource::DailyFallback { key }))
            }
            Ok(None) => Err(LedgerError::RestoreFailed {
                message: "all restore fallbacks exhausted: no verifiable snapshot in any series".to_string(),
            }),
            Err(e) => Err(LedgerError::RestoreFailed {
                message: format!("all restore fallbacks exhausted: {e}"),
            }),
        }
    }

    /// Newest-first walk of one snapshot series until a blob verifies
    async fn restore_from(&self, kind: SnapshotKind) -> LedgerResult<Option<(String, DomainStore)>> {
        let snapshots = self.list_with_retry(kind.prefix()).await?;
        for meta in snapshots {
            match self.fetch_and_verify(&meta).await {
                Ok(store) => return Ok(Some((meta.key, store))),
                Err(reason) => {
                    warn!("⚠️ Snapshot {} rejected: {}", meta.key, reason);
                }
            }
        }
        Ok(None)
    }

    async fn fetch_and_verify(&self, meta: &SnapshotMeta) -> Result<DomainStore, String> {
        let bytes = self
            .get_with_retry(&meta.key)
            .await
            .map_err(|e| format!("fetch failed: {e}"))?;
        let store = StoreFile::decode(&bytes).map_err(|e| format!("decode failed: {e}"))?;
        verify_store(&store)?;
        Ok(store)
    }

    async fn list_with_retry(&self, prefix: &str) -> LedgerResult<Vec<SnapshotMeta>> {
        let mut last_error = None;
        for attempt in 0..self.policy.max_attempts {
            match self.storage.list(prefix).await {
                Ok(snapshots) => return Ok(snapshots),
                Err(e) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        "⏳ Listing '{}' snapshots failed (attempt {}), retrying in {}ms: {}",
                        prefix,
                        attempt + 1,
                        delay.as_millis(),
                        e
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(last_error.expect("at least one attempt was made"))
    }

    async fn get_with_retry(&self, key: &str) -> LedgerResult<Vec<u8>> {
        let mut last_error = None;
        for attempt in 0..self.policy.max_attempts {
            match self.storage.get(key).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        "⏳ Fetching {} failed (attempt {}), retrying in {}ms: {}",
                        key,
                        attempt + 1,
                        delay.as_millis(),
                        e
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(last_error.expect("at least one attempt was made"))
    }
}
