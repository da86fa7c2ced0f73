//! One JSON file per object record, named after the object id.
//!
//! A commit touching several records first writes an undo journal holding the
//! prior contents of every touched record. The journal is removed once all
//! records are in place; a journal found later means the commit never
//! finished, and its prior contents are written back.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use super::Record;
use crate::error::Result;
use crate::model::ObjectId;

const RECORD_EXT: &str = "json";
const STAGING_EXT: &str = "json.tmp";
const JOURNAL_FILE: &str = "journal.json";
const JOURNAL_STAGING_FILE: &str = "journal.json.tmp";

/// Prior state of every object a commit touches. `None` marks an object the
/// commit creates.
pub(crate) type Prior = Vec<(ObjectId, Option<Record>)>;

#[derive(Debug, Serialize, Deserialize)]
struct Journal {
    sequence: u64,
    prior: Prior,
}

pub(crate) struct RecordDir {
    dir: PathBuf,
}

impl RecordDir {
    pub(crate) fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: ObjectId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXT))
    }

    fn staging_path(&self, id: ObjectId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, STAGING_EXT))
    }

    fn journal_path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE)
    }

    /// Load every record in the directory, first undoing any interrupted
    /// commit. Leftover staging files are discarded.
    pub(crate) fn load_all(&self) -> Result<HashMap<ObjectId, Record>> {
        self.recover()?;
        let mut records = HashMap::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if file_name.ends_with(STAGING_EXT) {
                warn!(path = %path.display(), "removing stale staging file");
                std::fs::remove_file(&path)?;
                continue;
            }
            let Some(stem) = file_name.strip_suffix(&format!(".{}", RECORD_EXT)) else {
                continue;
            };
            let Ok(id) = Uuid::parse_str(stem) else {
                continue;
            };
            let bytes = std::fs::read(&path)?;
            let record: Record = serde_json::from_slice(&bytes)?;
            records.insert(id, record);
        }
        Ok(records)
    }

    /// Roll back a commit whose journal is still present. Returns whether
    /// there was one.
    pub(crate) fn recover(&self) -> Result<bool> {
        let path = self.journal_path();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let journal: Journal = serde_json::from_slice(&bytes)?;
        warn!(
            sequence = journal.sequence,
            objects = journal.prior.len(),
            "rolling back interrupted commit"
        );
        self.restore(&journal.prior)?;
        std::fs::remove_file(&path)?;
        Ok(true)
    }

    /// Write `upserts` and delete `removals` as one unit.
    ///
    /// If any step fails the touched records are put back to `prior` before
    /// the error is returned. If the process dies part way, the journal left
    /// behind is rolled back by the next [`recover`](Self::recover).
    pub(crate) fn persist(
        &self,
        sequence: u64,
        prior: Prior,
        upserts: &[Record],
        removals: &[ObjectId],
    ) -> Result<()> {
        self.recover()?;
        let journal = Journal { sequence, prior };
        let bytes = serde_json::to_vec(&journal)?;
        write_synced(&self.dir.join(JOURNAL_STAGING_FILE), &self.journal_path(), &bytes)?;

        if let Err(err) = self.apply(upserts, removals) {
            match self.restore(&journal.prior) {
                Ok(()) => {
                    if let Err(e) = std::fs::remove_file(self.journal_path()) {
                        warn!(sequence, "failed to remove journal after rollback: {}", e);
                    }
                }
                Err(undo) => {
                    warn!(sequence, "rollback incomplete, journal kept: {}", undo);
                }
            }
            return Err(err);
        }
        std::fs::remove_file(self.journal_path())?;
        Ok(())
    }

    fn apply(&self, upserts: &[Record], removals: &[ObjectId]) -> Result<()> {
        for record in upserts {
            self.write_record(record)?;
        }
        for id in removals {
            self.remove_record(*id)?;
        }
        Ok(())
    }

    fn restore(&self, prior: &[(ObjectId, Option<Record>)]) -> Result<()> {
        for (id, record) in prior {
            match record {
                Some(record) => self.write_record(record)?,
                None => self.remove_record(*id)?,
            }
        }
        Ok(())
    }

    fn write_record(&self, record: &Record) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(record)?;
        write_synced(&self.staging_path(record.id), &self.path(record.id), &bytes)
    }

    /// Only regular files are removed; anything else under the record name
    /// was never written by us.
    fn remove_record(&self, id: ObjectId) -> Result<()> {
        let path = self.path(id);
        match std::fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_file() => std::fs::remove_file(&path)?,
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

/// Write `bytes` to `tmp`, sync, then rename over `dest`.
fn write_synced(tmp: &Path, dest: &Path, bytes: &[u8]) -> Result<()> {
    let written = write_then_rename(tmp, dest, bytes);
    if written.is_err() {
        let _ = std::fs::remove_file(tmp);
    }
    Ok(written?)
}

fn write_then_rename(tmp: &Path, dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(tmp, dest)
}
