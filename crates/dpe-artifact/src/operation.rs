//! Edit operations
//!
//! Proposers emit [`WireOperation`]s, a loosely typed shape shared by both
//! document flavors. Decoding turns each into one explicit variant per
//! (kind × flavor) combination, rejecting combinations that make no sense
//! before any patch is attempted:
//!
//! | wire                           | context                       | description                     |
//! |--------------------------------|-------------------------------|---------------------------------|
//! | add @ `root`                   | [`ContextOperation::ReplaceRoot`] (mapping only) | [`DescriptionOperation::ReplaceRoot`] |
//! | add @ path                     | [`ContextOperation::Add`]     | rejected                        |
//! | add @ anchors                  | rejected                      | [`DescriptionOperation::Insert`] |
//! | delete @ path                  | [`ContextOperation::Delete`]  | rejected                        |
//! | delete @ anchors               | rejected                      | [`DescriptionOperation::DeleteBlock`] |
//! | delete @ `root`                | rejected                      | rejected                        |

use crate::anchor::LineAnchor;
use crate::document::ContextDocument;
use crate::path::{LocationPath, PathError, ROOT_LOCATION};
use crate::payload::normalize_payload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Operation as emitted by a proposer
///
/// ```json
/// { "operation": "add",
///   "location": "entities[end]",
///   "block": {"name": "Payment"},
///   "reasoning": "new entity" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireOperation {
    /// `add` or `delete`
    pub operation: String,
    /// `root`, a dotted path, or a pair of line anchors
    pub location: WireLocation,
    /// Payload
    #[serde(default)]
    pub block: Value,
    /// Free text, not interpreted
    #[serde(default)]
    pub reasoning: String,
}

impl WireOperation {
    /// Add at a string location
    #[must_use]
    pub fn add(location: impl Into<String>, block: impl Into<Value>) -> Self {
        Self {
            operation: "add".into(),
            location: WireLocation::Path(location.into()),
            block: block.into(),
            reasoning: String::new(),
        }
    }

    /// Delete at a string location
    #[must_use]
    pub fn delete(location: impl Into<String>) -> Self {
        Self {
            operation: "delete".into(),
            location: WireLocation::Path(location.into()),
            block: Value::String(String::new()),
            reasoning: String::new(),
        }
    }

    /// Add between two line anchors
    #[must_use]
    pub fn insert_lines(
        after_line: impl Into<String>,
        before_line: impl Into<String>,
        block: impl Into<String>,
    ) -> Self {
        Self {
            operation: "add".into(),
            location: WireLocation::Lines {
                after_line: after_line.into(),
                before_line: before_line.into(),
            },
            block: Value::String(block.into()),
            reasoning: String::new(),
        }
    }

    /// Delete a contiguous block of lines
    #[must_use]
    pub fn delete_lines(
        after_line: impl Into<String>,
        before_line: impl Into<String>,
        block: impl Into<String>,
    ) -> Self {
        Self {
            operation: "delete".into(),
            ..Self::insert_lines(after_line, before_line, block)
        }
    }

    /// Attach a rationale
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Parsed operation kind
    ///
    /// # Errors
    /// Returns [`OperationError::UnknownKind`] for anything but add/delete
    pub fn kind(&self) -> Result<OpKind, OperationError> {
        match self.operation.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(OpKind::Add),
            "delete" => Ok(OpKind::Delete),
            _ => Err(OperationError::UnknownKind(self.operation.clone())),
        }
    }
}

/// Location field of a [`WireOperation`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireLocation {
    /// `root` or a dotted path
    Path(String),
    /// Anchor pair for text documents
    Lines {
        /// `(text)[n]` of the line to insert after
        after_line: String,
        /// `(text)[n]` of the line that bounds the insertion
        #[serde(default)]
        before_line: String,
    },
}

impl WireLocation {
    /// Whether this is the whole-document marker
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Path(p) if p.trim() == ROOT_LOCATION)
    }
}

impl Display for WireLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.write_str(path),
            Self::Lines {
                after_line,
                before_line,
            } => write!(f, "after {after_line} before {before_line}"),
        }
    }
}

/// Operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Insert or overwrite
    Add,
    /// Remove
    Delete,
}

/// Whether string payloads that look like JSON are parsed on decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// Parse `"{...}"` / `"[...]"` strings into structured values
    #[default]
    Normalize,
    /// Take payloads as given
    Verbatim,
}

/// Payload accepted by structural operations: mapping, sequence or string
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralPayload(Value);

impl StructuralPayload {
    /// Wrap a value, rejecting null, booleans and numbers
    ///
    /// # Errors
    /// Returns the JSON type name of a rejected scalar
    pub fn new(value: Value) -> Result<Self, &'static str> {
        match value {
            Value::Object(_) | Value::Array(_) | Value::String(_) => Ok(Self(value)),
            other => Err(json_type_name(&other)),
        }
    }

    /// Borrow the value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap the value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Typed operation on a structural (context) document
#[derive(Debug, Clone, PartialEq)]
pub enum ContextOperation {
    /// Replace the whole document
    ReplaceRoot {
        document: ContextDocument,
        rationale: String,
    },
    /// Set, append or insert at a path
    Add {
        path: LocationPath,
        payload: StructuralPayload,
        rationale: String,
    },
    /// Remove at a path
    Delete {
        path: LocationPath,
        rationale: String,
    },
}

impl ContextOperation {
    /// Decode a wire operation
    ///
    /// # Errors
    /// - [`OperationError::UnknownKind`] for kinds other than add/delete
    /// - [`OperationError::ExpectedPath`] for anchor locations
    /// - [`OperationError::DeleteAtRoot`] for `delete` on `root`
    /// - [`OperationError::RootPayloadNotMapping`] for non-mapping root payloads
    /// - [`OperationError::MalformedLocation`] for unparseable paths
    /// - [`OperationError::ScalarPayload`] for null/boolean/number payloads
    pub fn decode(wire: &WireOperation, mode: PayloadMode) -> Result<Self, OperationError> {
        let kind = wire.kind()?;
        let WireLocation::Path(location) = &wire.location else {
            return Err(OperationError::ExpectedPath(wire.location.to_string()));
        };

        let block = match mode {
            PayloadMode::Normalize => normalize_payload(wire.block.clone()),
            PayloadMode::Verbatim => wire.block.clone(),
        };
        let rationale = wire.reasoning.clone();

        if wire.location.is_root() {
            return match (kind, block) {
                (OpKind::Delete, _) => Err(OperationError::DeleteAtRoot),
                (OpKind::Add, Value::Object(document)) => Ok(Self::ReplaceRoot {
                    document,
                    rationale,
                }),
                (OpKind::Add, other) => Err(OperationError::RootPayloadNotMapping {
                    found: json_type_name(&other),
                }),
            };
        }

        let path: LocationPath =
            location
                .parse()
                .map_err(|source| OperationError::MalformedLocation {
                    location: location.clone(),
                    source,
                })?;

        if kind == OpKind::Delete {
            return Ok(Self::Delete { path, rationale });
        }

        let payload =
            StructuralPayload::new(block).map_err(|found| OperationError::ScalarPayload {
                location: location.clone(),
                found,
            })?;

        Ok(Self::Add {
            path,
            payload,
            rationale,
        })
    }

    /// Operation kind
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Self::ReplaceRoot { .. } | Self::Add { .. } => OpKind::Add,
            Self::Delete { .. } => OpKind::Delete,
        }
    }

    /// Rationale supplied by the proposer
    #[must_use]
    pub fn rationale(&self) -> &str {
        match self {
            Self::ReplaceRoot { rationale, .. }
            | Self::Add { rationale, .. }
            | Self::Delete { rationale, .. } => rationale,
        }
    }
}

impl Display for ContextOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReplaceRoot { .. } => write!(f, "add @ {ROOT_LOCATION}"),
            Self::Add { path, .. } => write!(f, "add @ {path}"),
            Self::Delete { path, .. } => write!(f, "delete @ {path}"),
        }
    }
}

/// Typed operation on a text (description) document
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptionOperation {
    /// Replace every line
    ReplaceRoot { text: String, rationale: String },
    /// Insert lines right after the `after` anchor
    Insert {
        after: LineAnchor,
        before: LineAnchor,
        block: String,
        rationale: String,
    },
    /// Remove the first contiguous occurrence of `block`
    DeleteBlock { block: String, rationale: String },
}

impl DescriptionOperation {
    /// Decode a wire operation
    ///
    /// Anchors are parsed leniently and never fail; see [`LineAnchor::parse`].
    ///
    /// # Errors
    /// - [`OperationError::UnknownKind`] for kinds other than add/delete
    /// - [`OperationError::ExpectedAnchors`] for a non-root string location
    /// - [`OperationError::DeleteAtRoot`] for `delete` on `root`
    /// - [`OperationError::TextPayloadNotString`] for non-string payloads
    pub fn decode(wire: &WireOperation) -> Result<Self, OperationError> {
        let kind = wire.kind()?;
        if kind == OpKind::Delete && wire.location.is_root() {
            return Err(OperationError::DeleteAtRoot);
        }
        let Value::String(block) = &wire.block else {
            return Err(OperationError::TextPayloadNotString {
                found: json_type_name(&wire.block),
            });
        };
        let block = block.clone();
        let rationale = wire.reasoning.clone();

        match (&wire.location, kind) {
            (location, OpKind::Add) if location.is_root() => {
                Ok(Self::ReplaceRoot {
                    text: block,
                    rationale,
                })
            }
            (WireLocation::Path(location), _) => {
                Err(OperationError::ExpectedAnchors(location.clone()))
            }
            (
                WireLocation::Lines {
                    after_line,
                    before_line,
                },
                OpKind::Add,
            ) => Ok(Self::Insert {
                after: LineAnchor::parse(after_line),
                before: LineAnchor::parse(before_line),
                block,
                rationale,
            }),
            (WireLocation::Lines { .. }, OpKind::Delete) => Ok(Self::DeleteBlock { block, rationale }),
        }
    }

    /// Operation kind
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Self::ReplaceRoot { .. } | Self::Insert { .. } => OpKind::Add,
            Self::DeleteBlock { .. } => OpKind::Delete,
        }
    }

    /// Rationale supplied by the proposer
    #[must_use]
    pub fn rationale(&self) -> &str {
        match self {
            Self::ReplaceRoot { rationale, .. }
            | Self::Insert { rationale, .. }
            | Self::DeleteBlock { rationale, .. } => rationale,
        }
    }
}

impl Display for DescriptionOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReplaceRoot { .. } => write!(f, "add @ {ROOT_LOCATION}"),
            Self::Insert { after, before, .. } => write!(f, "add after {after} before {before}"),
            Self::DeleteBlock { block, .. } => {
                write!(f, "delete block of {} line(s)", block.split('\n').count())
            }
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Errors decoding wire operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// Kind other than add/delete
    #[error("unknown operation kind '{0}' (expected add or delete)")]
    UnknownKind(String),

    /// Unparseable dotted path
    #[error("malformed location '{location}': {source}")]
    MalformedLocation {
        location: String,
        #[source]
        source: PathError,
    },

    /// Root replacement with something other than a mapping
    #[error("root operation requires a mapping payload, got {found}")]
    RootPayloadNotMapping { found: &'static str },

    /// Null, boolean or number payload on a structural operation
    #[error("payload at '{location}' must be a mapping, sequence or string, got {found}")]
    ScalarPayload {
        location: String,
        found: &'static str,
    },

    /// Non-string payload on a text operation
    #[error("text payload must be a string, got {found}")]
    TextPayloadNotString { found: &'static str },

    /// Anchor pair given where a path was expected
    #[error("expected a dotted path, got line anchors ({0})")]
    ExpectedPath(String),

    /// Path given where anchors were expected
    #[error("expected line anchors, got '{0}'")]
    ExpectedAnchors(String),

    /// Deleting the whole document is not an edit
    #[error("delete is not allowed at root")]
    DeleteAtRoot,
}
