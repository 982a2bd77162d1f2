//! JSON-file record store
//!
//! All records live in one JSON file. Every append rewrites the file through
//! a temporary sibling that is renamed over the original, so the file on disk
//! always holds either the old or the new set of records.

use crate::error::LedgerError;
use crate::store::{check_extends, RecordStore};
use dpe_artifact::{ArtifactId, ArtifactKey, DiagramArtifact};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct StoreFile {
    format: u32,
    artifacts: Vec<DiagramArtifact>,
}

/// Record store backed by a single JSON file
#[derive(Debug)]
pub struct JsonFileRecordStore {
    path: PathBuf,
    records: Mutex<Vec<DiagramArtifact>>,
}

impl JsonFileRecordStore {
    /// Open (or lazily create) the store at `path`
    ///
    /// A missing file is an empty store; it is created on the first append.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or decoded, or if
    /// any record fails its digest check
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let records = match std::fs::File::open(&path) {
            Ok(file) => {
                let stored: StoreFile = serde_json::from_reader(BufReader::new(file))?;
                if stored.format != FORMAT_VERSION {
                    return Err(LedgerError::UnsupportedFormat(stored.format));
                }
                if let Some(bad) = stored.artifacts.iter().find(|a| !a.verify()) {
                    return Err(LedgerError::Corrupt(bad.id()));
                }
                stored.artifacts
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(LedgerError::io(&path, e)),
        };

        info!(path = %path.display(), records = records.len(), "record store opened");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, artifacts: &[DiagramArtifact]) -> Result<(), LedgerError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| LedgerError::io(dir, e))?;
        let tmp_path = tmp.path().to_path_buf();

        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(
                &mut writer,
                &StoreFileRef {
                    format: FORMAT_VERSION,
                    artifacts,
                },
            )?;
            writer.flush().map_err(|e| LedgerError::io(&tmp_path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| LedgerError::io(&tmp_path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| LedgerError::io(&self.path, e.error))?;
        Ok(())
    }
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    format: u32,
    artifacts: &'a [DiagramArtifact],
}

impl RecordStore for JsonFileRecordStore {
    fn get_latest(&self, key: &ArtifactKey) -> Result<Option<DiagramArtifact>, LedgerError> {
        let records = self.records.lock();
        Ok(records
            .iter()
            .filter(|a| a.key() == key)
            .max_by_key(|a| a.version())
            .cloned())
    }

    fn append(&self, artifact: DiagramArtifact) -> Result<DiagramArtifact, LedgerError> {
        let mut records = self.records.lock();

        if records.iter().any(|a| a.id() == artifact.id()) {
            return Err(LedgerError::DuplicateId(artifact.id()));
        }
        let head = records
            .iter()
            .filter(|a| a.key() == artifact.key())
            .max_by_key(|a| a.version());
        check_extends(head, &artifact)?;

        let mut next = records.clone();
        next.push(artifact.clone());
        self.write_all(&next)?;
        *records = next;

        debug!(
            path = %self.path.display(),
            key = %artifact.key(),
            version = artifact.version(),
            "record appended"
        );
        Ok(artifact)
    }

    fn get(&self, id: ArtifactId) -> Result<Option<DiagramArtifact>, LedgerError> {
        Ok(self.records.lock().iter().find(|a| a.id() == id).cloned())
    }

    fn versions(&self, key: &ArtifactKey) -> Result<Vec<DiagramArtifact>, LedgerError> {
        let mut found: Vec<DiagramArtifact> = self
            .records
            .lock()
            .iter()
            .filter(|a| a.key() == key)
            .cloned()
            .collect();
        found.sort_by_key(DiagramArtifact::version);
        Ok(found)
    }

    fn conversation(&self, conversation_id: &str) -> Result<Vec<DiagramArtifact>, LedgerError> {
        let mut found: Vec<DiagramArtifact> = self
            .records
            .lock()
            .iter()
            .filter(|a| a.key().conversation_id == conversation_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.created_at(), a.id()));
        Ok(found)
    }
}
