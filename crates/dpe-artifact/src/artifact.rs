//! Versioned diagram artifacts
//!
//! A [`DiagramArtifact`] is one immutable snapshot of both documents for a
//! given [`ArtifactKey`]. Snapshots are only built from an [`ArtifactDraft`]
//! by whoever assigns versions (the ledger), so `version` and
//! `parent_version_id` are never set by hand.

use crate::document::{ContextDocument, DocumentFlavor, StructuralFlavor, TextDocument, TextFlavor};
use crate::hash::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use ulid::Ulid;

/// Kind of diagram being built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    Class,
    Sequence,
    Component,
    Activity,
    State,
    Usecase,
    Deployment,
    Package,
    Object,
    Timing,
}

impl DiagramKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 10] = [
        Self::Class,
        Self::Sequence,
        Self::Component,
        Self::Activity,
        Self::State,
        Self::Usecase,
        Self::Deployment,
        Self::Package,
        Self::Object,
        Self::Timing,
    ];

    /// Lowercase identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Sequence => "sequence",
            Self::Component => "component",
            Self::Activity => "activity",
            Self::State => "state",
            Self::Usecase => "usecase",
            Self::Deployment => "deployment",
            Self::Package => "package",
            Self::Object => "object",
            Self::Timing => "timing",
        }
    }
}

impl Display for DiagramKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramKind {
    type Err = UnknownDiagramKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| UnknownDiagramKind(s.to_string()))
    }
}

/// Diagram kind string that names no known kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown diagram kind '{0}'")]
pub struct UnknownDiagramKind(pub String);

/// `(owner, conversation, diagram kind)` identity of a version chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub owner_id: String,
    pub conversation_id: String,
    pub diagram_kind: DiagramKind,
}

impl ArtifactKey {
    /// Create a key
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        conversation_id: impl Into<String>,
        diagram_kind: DiagramKind,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            conversation_id: conversation_id.into(),
            diagram_kind,
        }
    }
}

impl Display for ArtifactKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.owner_id, self.conversation_id, self.diagram_kind
        )
    }
}

/// Unique artifact identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Ulid);

impl ArtifactId {
    /// Generate a fresh id
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Wrap an existing ULID
    #[inline]
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Underlying ULID
    #[inline]
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ArtifactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtifactId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Contents of the next version, before a version number is assigned
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactDraft {
    pub key: ArtifactKey,
    pub message_id: String,
    pub context: ContextDocument,
    pub description: TextDocument,
}

impl ArtifactDraft {
    /// Create a draft
    #[must_use]
    pub fn new(
        key: ArtifactKey,
        message_id: impl Into<String>,
        context: ContextDocument,
        description: TextDocument,
    ) -> Self {
        Self {
            key,
            message_id: message_id.into(),
            context,
            description,
        }
    }
}

/// Immutable snapshot of one version
///
/// # Invariants
/// - `version >= 1`
/// - `parent_version_id` is `None` exactly when `version == 1`
/// - digests match the documents (see [`DiagramArtifact::verify`])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramArtifact {
    id: ArtifactId,
    #[serde(flatten)]
    key: ArtifactKey,
    message_id: String,
    version: u32,
    parent_version_id: Option<ArtifactId>,
    context: ContextDocument,
    description: TextDocument,
    context_digest: ContentHash,
    description_digest: ContentHash,
    created_at: DateTime<Utc>,
}

impl DiagramArtifact {
    /// Seal a draft as the version following `parent`
    ///
    /// With no parent the snapshot becomes version 1.
    #[must_use]
    pub fn from_draft(draft: ArtifactDraft, parent: Option<&Self>) -> Self {
        let (version, parent_version_id) = match parent {
            Some(parent) => (parent.version.saturating_add(1), Some(parent.id)),
            None => (1, None),
        };
        let context_digest = StructuralFlavor::digest(&draft.context);
        let description_digest = TextFlavor::digest(&draft.description);

        Self {
            id: ArtifactId::new(),
            key: draft.key,
            message_id: draft.message_id,
            version,
            parent_version_id,
            context: draft.context,
            description: draft.description,
            context_digest,
            description_digest,
            created_at: Utc::now(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ArtifactId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &ArtifactKey {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// 1-based version within the key's chain
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    #[must_use]
    pub fn parent_version_id(&self) -> Option<ArtifactId> {
        self.parent_version_id
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &ContextDocument {
        &self.context
    }

    #[inline]
    #[must_use]
    pub fn description(&self) -> &TextDocument {
        &self.description
    }

    #[inline]
    #[must_use]
    pub fn context_digest(&self) -> &ContentHash {
        &self.context_digest
    }

    #[inline]
    #[must_use]
    pub fn description_digest(&self) -> &ContentHash {
        &self.description_digest
    }

    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Recompute both digests and compare (useful after deserialization)
    #[must_use]
    pub fn verify(&self) -> bool {
        self.context_digest == StructuralFlavor::digest(&self.context)
            && self.description_digest == TextFlavor::digest(&self.description)
    }
}
