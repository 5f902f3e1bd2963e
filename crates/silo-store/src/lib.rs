pub mod backup;
pub mod fs_store;

pub use backup::{BackupRotator, Snapshot, BACKUP_DIR, MAX_BACKUPS};
pub use fs_store::{FsStore, FsStoreOptions, SkippedRecord, LOCK_FILE};
