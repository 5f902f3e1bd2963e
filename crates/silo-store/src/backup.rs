//! Rotating per-person backups.
//!
//! Snapshots live in `<data_dir>/backups/` and are named
//! `<person>.<capture-micros>.<ext>`, where `ext` is the extension of the
//! record file they were copied from. Ordering uses the capture stamp in the
//! name, not filesystem metadata.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use silo_core::{PersonId, RecordFormat, SiloError, SiloResult};

pub const BACKUP_DIR: &str = "backups";
pub const MAX_BACKUPS: usize = 5;

/// One retained copy of a person's record file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub path: PathBuf,
    /// Capture instant, microseconds since the Unix epoch.
    pub captured_micros: i64,
    pub format: RecordFormat,
}

pub struct BackupRotator {
    dir: PathBuf,
    max_backups: usize,
}

impl BackupRotator {
    pub fn new(dir: impl Into<PathBuf>, max_backups: usize) -> Self {
        Self {
            dir: dir.into(),
            max_backups,
        }
    }

    /// Snapshot `current` before it is overwritten, then prune.
    pub fn rotate(&self, person: &PersonId, current: &Path) -> SiloResult<Option<PathBuf>> {
        self.rotate_at(person, current, Utc::now())
    }

    /// Like [`rotate`](Self::rotate) with an explicit capture time.
    ///
    /// Returns `Ok(None)` when `current` does not exist or retention is 0.
    /// A failed copy is an error and nothing is pruned. The capture stamp is
    /// moved past the newest existing snapshot so names never collide.
    pub fn rotate_at(
        &self,
        person: &PersonId,
        current: &Path,
        now: DateTime<Utc>,
    ) -> SiloResult<Option<PathBuf>> {
        if self.max_backups == 0 || !current.is_file() {
            return Ok(None);
        }
        let format = current
            .extension()
            .and_then(|e| e.to_str())
            .and_then(RecordFormat::from_extension)
            .ok_or_else(|| {
                SiloError::Validation(format!("not a record file: {}", current.display()))
            })?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            SiloError::io(format!("creating backup dir {}", self.dir.display()), e)
        })?;

        let mut stamp = now.timestamp_micros();
        if let Some(newest) = self.snapshots(person)?.first() {
            stamp = stamp.max(newest.captured_micros.saturating_add(1));
        }

        let target = self.dir.join(snapshot_name(person, stamp, format));
        fs::copy(current, &target).map_err(|e| {
            SiloError::io(
                format!("backing up {} to {}", current.display(), target.display()),
                e,
            )
        })?;
        tracing::debug!(%person, snapshot = %target.display(), "backup written");

        self.prune(person)?;
        Ok(Some(target))
    }

    /// All snapshots for `person`, newest first.
    pub fn snapshots(&self, person: &PersonId) -> SiloResult<Vec<Snapshot>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SiloError::io(
                    format!("listing backups in {}", self.dir.display()),
                    e,
                ))
            }
        };

        let mut snapshots: Vec<Snapshot> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let name = path.file_name()?.to_str()?;
                let (owner, captured_micros, format) = parse_snapshot_name(name)?;
                if owner != person.as_str() {
                    return None;
                }
                Some(Snapshot {
                    path,
                    captured_micros,
                    format,
                })
            })
            .collect();

        snapshots.sort_by(|a, b| b.captured_micros.cmp(&a.captured_micros));
        Ok(snapshots)
    }

    /// Delete every snapshot for `person` beyond the retention count. Delete
    /// failures are logged; the snapshot just taken is already safe.
    pub fn prune(&self, person: &PersonId) -> SiloResult<usize> {
        let mut removed = 0;
        for old in self.snapshots(person)?.iter().skip(self.max_backups) {
            match fs::remove_file(&old.path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(
                    snapshot = %old.path.display(),
                    "cannot remove old backup: {e}"
                ),
            }
        }
        if removed > 0 {
            tracing::debug!(%person, removed, "pruned old backups");
        }
        Ok(removed)
    }
}

fn micros_to_datetime(micros: i64) -> Option<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}

fn snapshot_name(person: &PersonId, micros: i64, format: RecordFormat) -> String {
    format!("{person}.{micros}.{}", format.extension())
}

/// Stamps chrono cannot represent are not ours and are left alone.
fn parse_snapshot_name(name: &str) -> Option<(&str, i64, RecordFormat)> {
    let mut parts = name.split('.');
    let person = parts.next()?;
    let micros: i64 = parts.next()?.parse().ok()?;
    micros_to_datetime(micros)?;
    let format = RecordFormat::from_extension(parts.next()?)?;
    if parts.next().is_some() || !PersonId::is_valid(person) {
        return None;
    }
    Some((person, micros, format))
}
