//! Patch errors
//!
//! Only the structural patcher produces these; text patching absorbs every
//! anchor and block miss. Any error aborts the whole batch so a partially
//! patched document is never returned.

use dpe_artifact::OperationError;

/// Errors that abort a patch batch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// Wire operation could not be decoded
    #[error("operation {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: OperationError,
    },

    /// Existing value on the path has the wrong container shape
    #[error("operation {index} at '{location}': step '{step}' expected a {expected}, found a {found}")]
    ShapeMismatch {
        index: usize,
        location: String,
        step: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Intermediate index would pad a sequence past the limit
    #[error("operation {index} at '{location}': index {requested} exceeds padding limit {limit}")]
    PadLimitExceeded {
        index: usize,
        location: String,
        requested: usize,
        limit: usize,
    },
}

impl PatchError {
    /// Position of the offending operation in its batch
    #[must_use]
    pub fn operation_index(&self) -> usize {
        match self {
            Self::Decode { index, .. }
            | Self::ShapeMismatch { index, .. }
            | Self::PadLimitExceeded { index, .. } => *index,
        }
    }

    /// Whether the error came from decoding rather than applying
    #[inline]
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
