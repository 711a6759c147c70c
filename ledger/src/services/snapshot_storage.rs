//! Directory-backed snapshot storage implementation
//!
//! Production deployments point this at a mounted object-storage bucket;
//! tests point it at a temp directory. Keys embed a UTC timestamp so
//! list-by-timestamp needs no side metadata.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::PathBuf;
use tokio::fs;

use crate::error::{LedgerError, LedgerResult};
use crate::traits::{SnapshotMeta, SnapshotStorage};
use tracing::debug;

const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

/// Build a snapshot key under a prefix for the given instant
pub fn snapshot_key(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}/ledger-{}.json", at.format(KEY_TIMESTAMP_FORMAT))
}

/// Recover the timestamp embedded in a snapshot key, if any
pub fn parse_snapshot_timestamp(key: &str) -> Option<DateTime<Utc>> {
    let file_name = key.rsplit('/').next()?;
    let stamp = file_name.strip_prefix("ledger-")?.strip_suffix(".json")?;
    NaiveDateTime::parse_from_str(stamp, KEY_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Snapshot storage over a local/mounted directory
pub struct DirSnapshotStorage {
    base_dir: PathBuf,
}

impl DirSnapshotStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }
}

#[async_trait]
impl SnapshotStorage for DirSnapshotStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> LedgerResult<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::storage("put", e.to_string()))?;
        }
        fs::write(&path, &bytes)
            .await
            .map_err(|e| LedgerError::storage("put", e.to_string()))?;
        debug!("📤 Uploaded snapshot {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> LedgerResult<Vec<u8>> {
        fs::read(self.path_for(key))
            .await
            .map_err(|e| LedgerError::storage("get", format!("{key}: {e}")))
    }

    async fn list(&self, prefix: &str) -> LedgerResult<Vec<SnapshotMeta>> {
        let dir = self.base_dir.join(prefix);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut reader = fs::read_dir(&dir)
            .await
            .map_err(|e| LedgerError::storage("list", e.to_string()))?;

        let mut snapshots = Vec::new();
        while let Some(dir_entry) = reader
            .next_entry()
            .await
            .map_err(|e| LedgerError::storage("list", e.to_string()))?
        {
            let file_name = dir_entry.file_name().to_string_lossy().to_string();
            let key = format!("{prefix}/{file_name}");
            // Files without an embedded timestamp are not snapshots
            let Some(timestamp) = parse_snapshot_timestamp(&key) else {
                continue;
            };
            let size = dir_entry
                .metadata()
                .await
                .map_err(|e| LedgerError::storage("list", e.to_string()))?
                .len();
            snapshots.push(SnapshotMeta { key, timestamp, size });
        }

        snapshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(snapshots)
    }
}
