//! Trait definitions with mockall annotations for testing
//!
//! The remote snapshot store is the one external seam the durability
//! subsystem depends on; it is injected so tests can exercise restore
//! fallbacks and backup guards without real object storage.

use chrono::{DateTime, Utc};

use crate::error::LedgerResult;

/// Metadata for one stored snapshot blob
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotMeta {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
}

/// Remote object storage abstraction for snapshot blobs
///
/// Keys are flat strings with a `/`-separated prefix (`periodic/...`,
/// `daily/...`). Listing returns newest-first within a prefix.
#[mockall::automock]
#[async_trait::async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Upload a snapshot blob under the given key
    async fn put(&self, key: &str, bytes: Vec<u8>) -> LedgerResult<()>;

    /// Fetch a snapshot blob by key
    async fn get(&self, key: &str) -> LedgerResult<Vec<u8>>;

    /// List snapshot blobs under a prefix, newest first
    async fn list(&self, prefix: &str) -> LedgerResult<Vec<SnapshotMeta>>;
}
