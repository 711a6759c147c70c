//! Local persisted store document
//!
//! The live store is one JSON document on local disk, written atomically
//! (temp file + rename) so a crash mid-write can never corrupt the only
//! local copy.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::core::DomainStore;
use crate::error::LedgerResult;
use tracing::{debug, warn};

/// Handle to the local store document
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the store from disk. `Ok(None)` means no document exists yet;
    /// a document that fails to parse is surfaced as an error so the
    /// caller can fall back to a remote snapshot.
    pub async fn load(&self) -> LedgerResult<Option<DomainStore>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path).await?;
        let mut store: DomainStore = serde_json::from_slice(&bytes)?;
        store.rebuild_indexes();
        debug!("💾 Loaded local store from {}", self.path.display());
        Ok(Some(store))
    }

    /// Persist the store atomically: write to a temp file alongside the
    /// target, then rename over it.
    pub async fn save(&self, store: &DomainStore) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(store)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &bytes).await?;
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            // Leave no stale temp file behind on a failed rename
            let _ = fs::remove_file(&tmp_path).await;
            warn!("❌ Failed to persist store to {}: {}", self.path.display(), e);
            return Err(e.into());
        }
        debug!("💾 Persisted store ({} bytes) to {}", bytes.len(), self.path.display());
        Ok(())
    }

    /// Serialize the store to the snapshot blob format
    pub fn encode(store: &DomainStore) -> LedgerResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(store)?)
    }

    /// Decode a snapshot blob back into a store with live indexes
    pub fn decode(bytes: &[u8]) -> LedgerResult<DomainStore> {
        let mut store: DomainStore = serde_json::from_slice(bytes)?;
        store.rebuild_indexes();
        Ok(store)
    }
}
