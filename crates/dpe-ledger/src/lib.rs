//! DPE Version ledger
//!
//! Linear version chains per `(owner, conversation, diagram kind)` key.
//!
//! # Core Concepts
//!
//! - [`VersionLedger`]: reads heads and commits drafts as the next version
//! - [`RecordStore`]: persistence contract behind the ledger
//! - [`InMemoryRecordStore`]: concurrent in-process store
//! - [`JsonFileRecordStore`]: single JSON file, atomically rewritten on append
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dpe_artifact::{ArtifactDraft, ArtifactKey, DiagramKind, TextDocument};
//! use dpe_ledger::{InMemoryRecordStore, VersionLedger};
//!
//! let ledger = VersionLedger::new(Arc::new(InMemoryRecordStore::new()));
//! let key = ArtifactKey::new("owner", "conversation", DiagramKind::Class);
//! let draft = ArtifactDraft::new(
//!     key.clone(),
//!     "message-1",
//!     serde_json::Map::new(),
//!     TextDocument::from("@startuml\nclass A\n@enduml"),
//! );
//! let v1 = ledger.commit(draft).unwrap();
//! assert_eq!(v1.version(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod file;
mod ledger;
mod store;

pub use error::LedgerError;
pub use file::JsonFileRecordStore;
pub use ledger::VersionLedger;
pub use store::{InMemoryRecordStore, RecordStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
