//! Document flavors
//!
//! Defines the sealed [`DocumentFlavor`] trait tying a document type to the
//! operations that edit it, its digest and its post-patch validation.
//! Two flavors exist: [`StructuralFlavor`] for the JSON context mapping and
//! [`TextFlavor`] for the line-oriented diagram description.

use crate::hash::ContentHash;
use crate::operation::{
    ContextOperation, DescriptionOperation, OperationError, PayloadMode, WireOperation,
};
use serde_json::{Map, Value};
use std::fmt::{self, Debug, Display, Formatter};

/// Structural document: a JSON mapping at the root
pub type ContextDocument = Map<String, Value>;

/// Marker opening a diagram description
pub const START_MARKER: &str = "@startuml";

/// Marker closing a diagram description
pub const END_MARKER: &str = "@enduml";

/// Outcome of checking a patched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Document may be committed
    Passed,
    /// Document must be regenerated
    Failed(String),
}

impl Validation {
    /// Shorthand for a failure with a reason
    #[inline]
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Whether the document passed
    #[inline]
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Failure reason, if any
    #[inline]
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::Failed(reason) => Some(reason),
        }
    }
}

/// Trait for document flavors
///
/// This trait is **sealed**: only the two flavors in this crate implement it.
///
/// # Contract
/// - `digest` is deterministic
/// - `decode` rejects every wire operation whose location or payload does not
///   fit the flavor, so patchers only ever see well-formed operations
pub trait DocumentFlavor: Send + Sync + 'static + Debug + private::Sealed {
    /// Document type
    type Document: Send + Sync + 'static + Debug + Clone + PartialEq + Default;

    /// Typed edit operation
    type Operation: Send + Sync + 'static + Debug + Clone + PartialEq;

    /// Stable flavor identifier
    const FLAVOR_ID: &'static str;

    /// Content digest
    fn digest(document: &Self::Document) -> ContentHash;

    /// Post-patch check deciding whether a document may be committed
    fn validate(document: &Self::Document) -> Validation;

    /// Turn a wire operation into a typed one
    ///
    /// # Errors
    /// Returns error if the location or payload does not fit this flavor
    fn decode(wire: &WireOperation, mode: PayloadMode) -> Result<Self::Operation, OperationError>;
}

/// Sealed trait - prevents external implementations
#[doc(hidden)]
pub mod private {
    /// Sealed trait marker
    pub trait Sealed {}
}

/// JSON context documents edited by dotted paths
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralFlavor;

impl private::Sealed for StructuralFlavor {}

impl DocumentFlavor for StructuralFlavor {
    type Document = ContextDocument;
    type Operation = ContextOperation;

    const FLAVOR_ID: &'static str = "context";

    fn digest(document: &Self::Document) -> ContentHash {
        ContentHash::of_mapping(document)
    }

    fn validate(document: &Self::Document) -> Validation {
        if document.is_empty() {
            return Validation::failed("context is an empty mapping");
        }
        Validation::Passed
    }

    fn decode(wire: &WireOperation, mode: PayloadMode) -> Result<Self::Operation, OperationError> {
        ContextOperation::decode(wire, mode)
    }
}

/// Line-oriented diagram descriptions edited by anchors
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFlavor;

impl private::Sealed for TextFlavor {}

impl DocumentFlavor for TextFlavor {
    type Document = TextDocument;
    type Operation = DescriptionOperation;

    const FLAVOR_ID: &'static str = "description";

    fn digest(document: &Self::Document) -> ContentHash {
        ContentHash::of_text(&document.to_text())
    }

    fn validate(document: &Self::Document) -> Validation {
        let text = document.to_text();
        let text = text.trim();
        if text.is_empty() {
            return Validation::failed("description is empty");
        }

        let Some(start) = text.find(START_MARKER) else {
            return Validation::failed(format!("missing {START_MARKER} marker"));
        };
        let Some(end) = text.find(END_MARKER) else {
            return Validation::failed(format!("missing {END_MARKER} marker"));
        };
        if start >= end {
            return Validation::failed(format!("{START_MARKER} must come before {END_MARKER}"));
        }
        if text[start + START_MARKER.len()..end].trim().is_empty() {
            return Validation::failed("empty diagram content between markers");
        }
        Validation::Passed
    }

    fn decode(wire: &WireOperation, _mode: PayloadMode) -> Result<Self::Operation, OperationError> {
        DescriptionOperation::decode(wire)
    }
}

/// Ordered sequence of lines, conceptually newline-joined
///
/// Splitting and joining use `\n` only, so `from_text(s).to_text() == s` for
/// every string, including ones with trailing newlines or `\r\n` endings.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TextDocument {
    lines: Vec<String>,
}

impl TextDocument {
    /// Split text into lines
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: split_lines(text),
        }
    }

    /// Wrap existing lines
    #[inline]
    #[must_use]
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Lines in order
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Take the lines out
    #[inline]
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Number of lines
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// No lines at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Newline-joined form
    #[must_use]
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Split on `\n`, keeping empty segments
#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_owned).collect()
}

impl Display for TextDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<String> for TextDocument {
    fn from(text: String) -> Self {
        Self::from_text(&text)
    }
}

impl From<&str> for TextDocument {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<TextDocument> for String {
    fn from(document: TextDocument) -> Self {
        document.to_text()
    }
}
