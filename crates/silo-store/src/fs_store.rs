use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;

use silo_core::codec;
use silo_core::{
    AddOutcome, Category, Entry, NoteStore, PersonId, PersonRecord, RecordFormat, SiloError,
    SiloResult,
};

use crate::backup::{BackupRotator, BACKUP_DIR, MAX_BACKUPS};

pub const LOCK_FILE: &str = ".lock";

#[derive(Debug, Clone)]
pub struct FsStoreOptions {
    /// Snapshots kept per person. 0 disables backups.
    pub max_backups: usize,
    /// Hold an exclusive advisory lock on the data directory while open.
    pub lock: bool,
}

impl Default for FsStoreOptions {
    fn default() -> Self {
        Self {
            max_backups: MAX_BACKUPS,
            lock: true,
        }
    }
}

/// A record file that could not be loaded. It stays in place until the
/// person's next save moves it aside as `<file>.corrupt-<micros>`.
#[derive(Debug, Clone)]
pub struct SkippedRecord {
    pub person: PersonId,
    pub path: PathBuf,
    pub reason: String,
}

/// All people's notes, loaded from one directory of record files.
///
/// Every add is written through before it returns, so the in-memory map and
/// the directory agree whenever control is back with the caller.
pub struct FsStore {
    dir: PathBuf,
    records: BTreeMap<PersonId, PersonRecord>,
    skipped: Vec<SkippedRecord>,
    backups: BackupRotator,
    _lock: Option<File>,
}

impl FsStore {
    pub fn open(dir: impl Into<PathBuf>) -> SiloResult<Self> {
        Self::open_with(dir, FsStoreOptions::default())
    }

    pub fn open_with(dir: impl Into<PathBuf>, options: FsStoreOptions) -> SiloResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| SiloError::io(format!("cannot create data dir {}", dir.display()), e))?;

        let lock = if options.lock {
            Some(acquire_lock(&dir)?)
        } else {
            None
        };

        let mut store = Self {
            backups: BackupRotator::new(dir.join(BACKUP_DIR), options.max_backups),
            dir,
            records: BTreeMap::new(),
            skipped: Vec::new(),
            _lock: lock,
        };
        store.load()?;
        Ok(store)
    }

    pub fn backups(&self) -> &BackupRotator {
        &self.backups
    }

    /// Files skipped by the last [`load`](Self::load).
    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn record_path(&self, person: &PersonId, format: RecordFormat) -> PathBuf {
        self.dir.join(format!("{person}.{}", format.extension()))
    }

    /// Replace the in-memory map with what is on disk.
    ///
    /// One record file per person; `<person>.json` wins over a legacy
    /// `<person>.txt`, which is read instead when the JSON is corrupt.
    /// Unreadable or corrupt files are logged and skipped. Only failing to
    /// list the directory itself is an error.
    pub fn load(&mut self) -> SiloResult<()> {
        self.records.clear();
        self.skipped.clear();

        let entries = fs::read_dir(&self.dir)
            .map_err(|e| SiloError::io(format!("cannot read data dir {}", self.dir.display()), e))?;

        let mut found: HashMap<PersonId, Candidates> = HashMap::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("cannot read directory entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some((person, format)) = classify(&path) else {
                continue;
            };
            let candidates = found.entry(person).or_default();
            match format {
                RecordFormat::Json => candidates.json = Some(path),
                RecordFormat::LegacyText => candidates.legacy = Some(path),
            }
        }

        for (person, candidates) in found {
            let ordered = [
                (RecordFormat::Json, candidates.json),
                (RecordFormat::LegacyText, candidates.legacy),
            ];
            for (format, path) in ordered {
                let Some(path) = path else { continue };
                match read_record(&path, format) {
                    Ok(record) => {
                        self.records.insert(person.clone(), record);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), "skipping record: {e}");
                        self.skipped.push(SkippedRecord {
                            person: person.clone(),
                            path,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        tracing::debug!(
            people = self.records.len(),
            skipped = self.skipped.len(),
            "loaded records from {}",
            self.dir.display()
        );
        Ok(())
    }

    /// Back up whatever is on disk for `person`, then atomically replace it
    /// with the in-memory record. A legacy `.txt` file is backed up and
    /// removed once the JSON record is in place.
    pub fn save(&self, person: &PersonId) -> SiloResult<()> {
        let empty = PersonRecord::new();
        let record = self.records.get(person).unwrap_or(&empty);

        let json_path = self.record_path(person, RecordFormat::Json);
        let legacy_path = self.record_path(person, RecordFormat::LegacyText);

        self.backups.rotate(person, &json_path)?;
        let legacy = legacy_path.is_file();
        if legacy {
            self.backups.rotate(person, &legacy_path)?;
        }

        let bytes = codec::encode(record)?;
        write_atomic(&json_path, &bytes)?;
        tracing::debug!(%person, path = %json_path.display(), "record saved");

        if legacy {
            match fs::remove_file(&legacy_path) {
                Ok(()) => tracing::info!(%person, "migrated legacy record to JSON"),
                Err(e) => tracing::warn!(
                    path = %legacy_path.display(),
                    "cannot remove migrated legacy record: {e}"
                ),
            }
        }
        Ok(())
    }

    /// [`NoteStore::add`] with an explicit creation time.
    pub fn add_at(
        &mut self,
        person: &PersonId,
        category: Category,
        text: &str,
        now: DateTime<Utc>,
    ) -> SiloResult<AddOutcome> {
        let Some(entry) = Entry::new(text, now) else {
            tracing::debug!(%person, %category, "ignoring blank entry");
            return Ok(AddOutcome::IgnoredBlank);
        };
        self.quarantine_skipped(person, now)?;

        let is_new = !self.records.contains_key(person);
        self.records
            .entry(person.clone())
            .or_default()
            .prepend(category, entry);

        if let Err(e) = self.save(person) {
            self.rollback(person, category, is_new);
            return Err(e);
        }
        Ok(AddOutcome::Saved)
    }

    /// Move `person`'s unloadable files out of the way before anything
    /// overwrites or rotates them. They are renamed in place, outside the
    /// backup directory, so pruning never reaches them.
    fn quarantine_skipped(&mut self, person: &PersonId, now: DateTime<Utc>) -> SiloResult<()> {
        let stamp = now.timestamp_micros();
        for skipped in self.skipped.iter().filter(|s| &s.person == person) {
            if !skipped.path.is_file() {
                continue;
            }
            let target = quarantine_path(&skipped.path, stamp);
            fs::rename(&skipped.path, &target).map_err(|e| {
                SiloError::io(format!("moving aside {}", skipped.path.display()), e)
            })?;
            tracing::warn!(
                %person,
                reason = %skipped.reason,
                "unreadable record kept as {}",
                target.display()
            );
        }
        self.skipped.retain(|s| &s.person != person);
        Ok(())
    }

    fn rollback(&mut self, person: &PersonId, category: Category, is_new: bool) {
        if is_new {
            self.records.remove(person);
        } else if let Some(record) = self.records.get_mut(person) {
            match category {
                Category::Eternal => record.eternal.remove(0),
                Category::Transient => record.transient.remove(0),
            };
        }
    }
}

impl NoteStore for FsStore {
    fn add(&mut self, person: &PersonId, category: Category, text: &str) -> SiloResult<AddOutcome> {
        self.add_at(person, category, text, Utc::now())
    }

    fn person(&self, person: &PersonId) -> Option<&PersonRecord> {
        self.records.get(person)
    }

    fn people(&self) -> Vec<PersonId> {
        self.records.keys().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Candidates {
    json: Option<PathBuf>,
    legacy: Option<PathBuf>,
}

fn quarantine_path(path: &Path, micros: i64) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.corrupt-{micros}"))
}

/// `<person>.<json|txt>` → (person, format). Anything else (lock file,
/// temp files, stray files) is `None`.
fn classify(path: &Path) -> Option<(PersonId, RecordFormat)> {
    let format = RecordFormat::from_extension(path.extension()?.to_str()?)?;
    let person = path.file_stem()?.to_str()?.parse().ok()?;
    Some((person, format))
}

fn read_record(path: &Path, format: RecordFormat) -> SiloResult<PersonRecord> {
    let bytes =
        fs::read(path).map_err(|e| SiloError::io(format!("reading {}", path.display()), e))?;
    let written_at = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    codec::decode_as(format, &bytes, written_at)
}

/// Write to a sibling temp file, fsync, then rename over `path`. Readers see
/// either the old file or the new one, never a partial write.
fn write_atomic(path: &Path, bytes: &[u8]) -> SiloResult<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SiloError::Validation(format!("bad record path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let result = write_synced(&tmp, bytes).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(SiloError::io(format!("writing {}", path.display()), e));
    }
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Exclusive advisory lock on `<dir>/.lock`, blocking until available.
fn acquire_lock(dir: &Path) -> SiloResult<File> {
    let path = dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|e| SiloError::io(format!("opening lock file {}", path.display()), e))?;

    if file.try_lock_exclusive().is_err() {
        tracing::info!("waiting for another silo process to release {}", path.display());
        file.lock_exclusive()
            .map_err(|e| SiloError::Locked(format!("{}: {e}", path.display())))?;
    }
    Ok(file)
}
