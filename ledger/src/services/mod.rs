//! Effectful service implementations around the pure core

pub mod backup;
pub mod restore;
pub mod snapshot_storage;
pub mod store_file;

pub use backup::{BackupService, SnapshotKind};
pub use restore::{RestoreService, RestoreSource, RetryPolicy};
pub use snapshot_storage::DirSnapshotStorage;
pub use store_file::StoreFile;
