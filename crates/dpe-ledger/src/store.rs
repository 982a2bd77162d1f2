//! Record store contract and the in-memory store

use crate::error::LedgerError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dpe_artifact::{ArtifactId, ArtifactKey, DiagramArtifact};
use std::fmt::Debug;

/// Persistence contract used by the version ledger
///
/// # Contract
/// - `append` accepts an artifact only if it extends the current head of its
///   key: `version == head.version + 1` and `parent == head.id` (or version 1
///   with no parent for an empty chain)
/// - A reader never observes a head whose record is not yet readable
pub trait RecordStore: Send + Sync + Debug {
    /// Current head of a key
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    fn get_latest(&self, key: &ArtifactKey) -> Result<Option<DiagramArtifact>, LedgerError>;

    /// Store `artifact` as the new head of its key
    ///
    /// # Errors
    /// Returns [`LedgerError::VersionConflict`] or [`LedgerError::ParentMismatch`]
    /// when the artifact does not extend the head, or an I/O error
    fn append(&self, artifact: DiagramArtifact) -> Result<DiagramArtifact, LedgerError>;

    /// Look up one artifact
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    fn get(&self, id: ArtifactId) -> Result<Option<DiagramArtifact>, LedgerError>;

    /// Every version of a key, oldest first
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    fn versions(&self, key: &ArtifactKey) -> Result<Vec<DiagramArtifact>, LedgerError>;

    /// Every artifact of a conversation, across owners and kinds, by creation time
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    fn conversation(&self, conversation_id: &str) -> Result<Vec<DiagramArtifact>, LedgerError>;
}

/// Check that `artifact` may follow `head`
pub(crate) fn check_extends(
    head: Option<&DiagramArtifact>,
    artifact: &DiagramArtifact,
) -> Result<(), LedgerError> {
    let expected = head.map_or(1, |h| h.version() + 1);
    if artifact.version() != expected {
        return Err(LedgerError::VersionConflict {
            key: artifact.key().clone(),
            expected,
            found: artifact.version(),
        });
    }

    let head_id = head.map(DiagramArtifact::id);
    if artifact.parent_version_id() != head_id {
        return Err(LedgerError::ParentMismatch {
            key: artifact.key().clone(),
            head: head_id,
            parent: artifact.parent_version_id(),
        });
    }
    Ok(())
}

/// Thread-safe in-process store
///
/// Chains are kept per key; appending holds the key's shard lock for the
/// whole check-and-insert, so two appends on one key cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<ArtifactId, DiagramArtifact>,
    chains: DashMap<ArtifactKey, Vec<ArtifactId>>,
}

impl InMemoryRecordStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored artifacts
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No artifacts stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn head_of(&self, chain: &[ArtifactId]) -> Option<DiagramArtifact> {
        chain
            .last()
            .and_then(|id| self.records.get(id).map(|r| r.value().clone()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get_latest(&self, key: &ArtifactKey) -> Result<Option<DiagramArtifact>, LedgerError> {
        Ok(self
            .chains
            .get(key)
            .and_then(|chain| self.head_of(chain.value())))
    }

    fn append(&self, artifact: DiagramArtifact) -> Result<DiagramArtifact, LedgerError> {
        if self.records.contains_key(&artifact.id()) {
            return Err(LedgerError::DuplicateId(artifact.id()));
        }

        match self.chains.entry(artifact.key().clone()) {
            Entry::Occupied(mut chain) => {
                let head = self.head_of(chain.get());
                check_extends(head.as_ref(), &artifact)?;
                self.records.insert(artifact.id(), artifact.clone());
                chain.get_mut().push(artifact.id());
            }
            Entry::Vacant(slot) => {
                check_extends(None, &artifact)?;
                self.records.insert(artifact.id(), artifact.clone());
                slot.insert(vec![artifact.id()]);
            }
        }
        Ok(artifact)
    }

    fn get(&self, id: ArtifactId) -> Result<Option<DiagramArtifact>, LedgerError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    fn versions(&self, key: &ArtifactKey) -> Result<Vec<DiagramArtifact>, LedgerError> {
        let Some(chain) = self.chains.get(key) else {
            return Ok(Vec::new());
        };
        Ok(chain
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| r.value().clone()))
            .collect())
    }

    fn conversation(&self, conversation_id: &str) -> Result<Vec<DiagramArtifact>, LedgerError> {
        let mut found: Vec<DiagramArtifact> = self
            .records
            .iter()
            .filter(|r| r.value().key().conversation_id == conversation_id)
            .map(|r| r.value().clone())
            .collect();
        found.sort_by_key(|a| (a.created_at(), a.id()));
        Ok(found)
    }
}
