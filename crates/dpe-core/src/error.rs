//! Error types for the turn engine
//!
//! Provides error handling for:
//! - Proposer failures and ill-formed proposals
//! - Patch batches aborted by the structural patcher
//! - Retry exhaustion per generation stage
//! - Ledger and timeout failures around a turn

use dpe_ledger::LedgerError;
use dpe_patch::PatchError;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Which document a generation cycle produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Structural context mapping
    Context,
    /// Text diagram description
    Description,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context => f.write_str("context"),
            Self::Description => f.write_str("description"),
        }
    }
}

/// Failure reported by a proposer backend
#[derive(Debug, thiserror::Error)]
pub enum ProposerError {
    /// Backend could not be reached or refused the request
    #[error("proposer unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with something that is not a list of operations
    #[error("malformed proposal: {0}")]
    Malformed(String),

    /// Any other backend failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a single produce-and-apply attempt failed
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    /// Proposer raised
    #[error("proposer failed: {0}")]
    Proposer(#[from] ProposerError),

    /// Patch batch aborted
    #[error("patch failed: {0}")]
    Patch(#[from] PatchError),
}

/// Every attempt of a validated retry failed
///
/// Carries the last raised error and the last validation reason; either may
/// be absent when every attempt failed the other way.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// Attempts made
    pub attempts: u32,
    /// Error raised by the most recent attempt that raised
    pub last_error: Option<E>,
    /// Reason from the most recent attempt that failed validation
    pub last_validation: Option<String>,
}

impl<E: Display> Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempt(s)", self.attempts)?;
        if let Some(error) = &self.last_error {
            write!(f, "; last error: {error}")?;
        }
        if let Some(reason) = &self.last_validation {
            write!(f, "; last validation failure: {reason}")?;
        }
        Ok(())
    }
}

impl<E: Error + 'static> Error for RetryExhausted<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.last_error.as_ref().map(|e| e as &(dyn Error + 'static))
    }
}

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A generation stage ran out of attempts
    #[error("{stage} generation failed: {source}")]
    Exhausted {
        stage: Stage,
        #[source]
        source: RetryExhausted<AttemptError>,
    },

    /// Reading the head or committing failed
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Turn exceeded its time budget; nothing was committed
    #[error("turn timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Invalid engine configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Check if running the turn again may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Ledger(e) => e.is_retryable(),
            Self::Exhausted { .. } | Self::Config(_) => false,
        }
    }

    /// Stage that failed, for exhaustion errors
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Exhausted { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
