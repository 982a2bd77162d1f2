//! DPE Patch engine
//!
//! Deterministic application of edit operations to diagram documents.
//!
//! # Core Concepts
//!
//! - [`Patcher`]: applies a batch of typed operations to one document flavor
//! - [`StructuralPatcher`]: dotted-path edits on the context mapping, aborts on bad shapes
//! - [`TextPatcher`]: anchor-based line edits on the description, never fails
//! - [`PatchReport`]: what each operation actually did
//!
//! # Example
//!
//! ```rust
//! use dpe_artifact::WireOperation;
//! use dpe_patch::{Patcher, StructuralPatcher};
//! use serde_json::json;
//!
//! let patched = StructuralPatcher::new()
//!     .apply_wire(None, &[WireOperation::add("root", json!({"a": [1]}))])
//!     .unwrap();
//! assert_eq!(patched.document["a"], json!([1]));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod patcher;
mod report;
mod structural;
mod text;

pub use error::PatchError;
pub use patcher::{DocumentOf, OperationOf, Patcher};
pub use report::{OpOutcome, OpRecord, PatchReport, Patched};
pub use structural::{StructuralPatcher, DEFAULT_MAX_PAD_INDEX};
pub use text::TextPatcher;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
