//! Ledger errors

use dpe_artifact::{ArtifactId, ArtifactKey};
use std::path::PathBuf;

/// Errors from record stores and the version ledger
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Appended artifact does not extend the current head
    #[error("version conflict on {key}: expected version {expected}, got {found}")]
    VersionConflict {
        key: ArtifactKey,
        expected: u32,
        found: u32,
    },

    /// Appended artifact names the wrong parent
    #[error("parent mismatch on {key}: head is {head:?}, artifact names {parent:?}")]
    ParentMismatch {
        key: ArtifactKey,
        head: Option<ArtifactId>,
        parent: Option<ArtifactId>,
    },

    /// An artifact with this id already exists
    #[error("duplicate artifact id {0}")]
    DuplicateId(ArtifactId),

    /// Stored record failed its digest check
    #[error("stored artifact {0} does not match its digests")]
    Corrupt(ArtifactId),

    /// Record file written by an incompatible version
    #[error("unsupported record file format {0}")]
    UnsupportedFormat(u32),

    /// Filesystem failure
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record file could not be encoded or decoded
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    /// Whether re-reading the head and committing again may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. } | Self::ParentMismatch { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
