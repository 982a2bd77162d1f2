//! DPE Artifact model
//!
//! Documents, addressing and typed edit operations for diagram artifacts.
//!
//! # Core Concepts
//!
//! - [`DocumentFlavor`]: ties a document type to its operations, digest and validation
//! - [`LocationPath`]: dotted `key[index|end]` addressing inside context mappings
//! - [`LineAnchor`]: `(text)[n]` addressing inside text descriptions
//! - [`WireOperation`]: proposer output, decoded into [`ContextOperation`] or [`DescriptionOperation`]
//! - [`DiagramArtifact`]: immutable versioned snapshot of both documents
//!
//! # Example
//!
//! ```rust
//! use dpe_artifact::{ContextOperation, PayloadMode, WireOperation};
//! use serde_json::json;
//!
//! let wire = WireOperation::add("entities[end]", json!({"name": "Payment"}));
//! let op = ContextOperation::decode(&wire, PayloadMode::Normalize).unwrap();
//! assert_eq!(op.to_string(), "add @ entities[end]");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod anchor;
mod artifact;
mod document;
mod hash;
mod operation;
mod path;
mod payload;

pub use anchor::{LineAnchor, LinePattern, EMPTY_LINE_SENTINEL};
pub use artifact::{
    ArtifactDraft, ArtifactId, ArtifactKey, DiagramArtifact, DiagramKind, UnknownDiagramKind,
};
pub use document::{
    split_lines, ContextDocument, DocumentFlavor, StructuralFlavor, TextDocument, TextFlavor,
    Validation, END_MARKER, START_MARKER,
};
pub use hash::{ContentHash, HashError};
pub use operation::{
    ContextOperation, DescriptionOperation, OpKind, OperationError, PayloadMode,
    StructuralPayload, WireLocation, WireOperation,
};
pub use path::{LocationPath, PathError, Step, StepIndex, ROOT_LOCATION};
pub use payload::normalize_payload;

/// Sealed trait support
#[doc(hidden)]
pub mod __private {
    pub use super::document::private::Sealed;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
