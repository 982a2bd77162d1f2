//! DPE Core - diagram turn engine
//!
//! Drives proposers, patchers and the version ledger through one turn:
//! - Validated retries per generation stage
//! - Per-key serialization of turns
//! - Optional turn timeout that never leaves a partial commit
//! - Rendering after commit
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dpe_artifact::{ArtifactKey, DiagramKind};
//! use dpe_core::{DiagramEngine, EngineConfig, TurnRequest};
//! use dpe_ledger::{InMemoryRecordStore, VersionLedger};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = VersionLedger::new(Arc::new(InMemoryRecordStore::new()));
//! let engine = DiagramEngine::new(ledger, context_proposer, description_proposer, EngineConfig::new())?;
//!
//! let key = ArtifactKey::new("owner", "conversation", DiagramKind::Class);
//! let outcome = engine
//!     .run_turn(TurnRequest::create(key, "message-1", "model a payment service"))
//!     .await?;
//! println!("committed version {}", outcome.artifact.version());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
mod locks;
pub mod proposer;
pub mod renderer;
pub mod retry;

pub use config::EngineConfig;
pub use engine::{DiagramEngine, RenderStatus, TurnOutcome, TurnRequest};
pub use error::{AttemptError, EngineError, ProposerError, RetryExhausted, Stage};
pub use proposer::{parse_proposal, ProposalRequest, Proposer};
pub use renderer::{CommandRenderer, RenderError, Renderer, DEFAULT_RENDER_TIMEOUT};
pub use retry::{Attempt, Attempted, RetryPolicy, DEFAULT_MAX_ATTEMPTS};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::{
        DiagramEngine, EngineConfig, EngineError, ProposalRequest, Proposer, ProposerError,
        RenderStatus, Renderer, TurnOutcome, TurnRequest,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
