//! Version ledger
//!
//! The ledger is the only writer of artifacts. It assigns version numbers and
//! parent links from the current head, so callers only ever hand it drafts.

use crate::error::LedgerError;
use crate::store::RecordStore;
use dpe_artifact::{ArtifactDraft, ArtifactId, ArtifactKey, DiagramArtifact};
use std::sync::Arc;
use tracing::info;

/// Head tracking and version assignment over a [`RecordStore`]
#[derive(Debug, Clone)]
pub struct VersionLedger {
    store: Arc<dyn RecordStore>,
}

impl VersionLedger {
    /// Ledger over `store`
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Current head of `key`
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn latest(&self, key: &ArtifactKey) -> Result<Option<DiagramArtifact>, LedgerError> {
        self.store.get_latest(key)
    }

    /// Seal `draft` as the next version of its key and store it as the head
    ///
    /// Version 1 with no parent when the key is empty, otherwise
    /// `head.version + 1` with `head.id` as parent.
    ///
    /// # Errors
    /// Returns [`LedgerError::VersionConflict`] if another writer committed
    /// to the same key in between, or a store error
    pub fn commit(&self, draft: ArtifactDraft) -> Result<DiagramArtifact, LedgerError> {
        let head = self.store.get_latest(&draft.key)?;
        let artifact = DiagramArtifact::from_draft(draft, head.as_ref());
        let committed = self.store.append(artifact)?;

        info!(
            key = %committed.key(),
            version = committed.version(),
            id = %committed.id(),
            "version committed"
        );
        Ok(committed)
    }

    /// Every version of `key`, oldest first
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn history(&self, key: &ArtifactKey) -> Result<Vec<DiagramArtifact>, LedgerError> {
        self.store.versions(key)
    }

    /// Look up one artifact
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn get(&self, id: ArtifactId) -> Result<Option<DiagramArtifact>, LedgerError> {
        self.store.get(id)
    }

    /// Every artifact of a conversation
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    pub fn conversation(&self, conversation_id: &str) -> Result<Vec<DiagramArtifact>, LedgerError> {
        self.store.conversation(conversation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;
    use dpe_artifact::{DiagramKind, TextDocument};
    use serde_json::json;

    fn draft(key: &ArtifactKey, n: u32) -> ArtifactDraft {
        ArtifactDraft::new(
            key.clone(),
            format!("m{n}"),
            json!({"n": n}).as_object().cloned().unwrap(),
            TextDocument::from(format!("@startuml\nA{n}\n@enduml").as_str()),
        )
    }

    #[test]
    fn commit_assigns_versions_and_parents() {
        let ledger = VersionLedger::new(Arc::new(InMemoryRecordStore::new()));
        let key = ArtifactKey::new("u", "c", DiagramKind::Class);
        assert_eq!(ledger.latest(&key).unwrap(), None);

        let v1 = ledger.commit(draft(&key, 1)).unwrap();
        let v2 = ledger.commit(draft(&key, 2)).unwrap();

        assert_eq!((v1.version(), v1.parent_version_id()), (1, None));
        assert_eq!((v2.version(), v2.parent_version_id()), (2, Some(v1.id())));
        assert_eq!(ledger.latest(&key).unwrap(), Some(v2.clone()));
        assert_eq!(ledger.get(v1.id()).unwrap(), Some(v1));
        assert_eq!(ledger.history(&key).unwrap().len(), 2);
    }
}
