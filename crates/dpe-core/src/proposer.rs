//! Proposer capability
//!
//! A proposer decides *what* to edit. The engine only sees the operations it
//! returns, so any backend (language model, rule engine, scripted fixture)
//! plugs in behind [`Proposer`].

use crate::error::ProposerError;
use async_trait::async_trait;
use dpe_artifact::{DiagramKind, DocumentFlavor, WireOperation};
use serde::Deserialize;

/// Everything a proposer is told for one attempt
#[derive(Debug, Clone)]
pub struct ProposalRequest<F: DocumentFlavor> {
    /// Kind of diagram being edited
    pub diagram_kind: DiagramKind,
    /// Natural-language task for this turn
    pub task: String,
    /// Current document, `None` for a fresh creation
    pub previous: Option<F::Document>,
    /// Operations already applied upstream this turn (context operations
    /// when proposing description edits)
    pub upstream: Vec<WireOperation>,
    /// 1-based attempt number within the retry cycle
    pub attempt: u32,
    /// Why the previous attempt failed, when the engine is configured to
    /// feed it back
    pub feedback: Option<String>,
}

impl<F: DocumentFlavor> ProposalRequest<F> {
    /// Whether the proposer is creating the document from scratch
    #[inline]
    #[must_use]
    pub fn is_creation(&self) -> bool {
        self.previous.is_none()
    }
}

/// Produces edit operations for one document flavor
#[async_trait]
pub trait Proposer<F: DocumentFlavor>: Send + Sync {
    /// Propose operations for `request`
    ///
    /// # Errors
    /// Returns error if the backend fails or answers with something that is
    /// not a list of operations
    async fn propose(
        &self,
        request: ProposalRequest<F>,
    ) -> Result<Vec<WireOperation>, ProposerError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProposalShape {
    Wrapped { operations: Vec<WireOperation> },
    Bare(Vec<WireOperation>),
}

/// Parse backend output into wire operations
///
/// Accepts `{"operations": [...]}` or a bare `[...]`, optionally wrapped in a
/// Markdown code fence.
///
/// # Errors
/// Returns [`ProposerError::Malformed`] if the text is neither shape
pub fn parse_proposal(text: &str) -> Result<Vec<WireOperation>, ProposerError> {
    let body = strip_code_fence(text.trim());
    match serde_json::from_str::<ProposalShape>(body) {
        Ok(ProposalShape::Wrapped { operations } | ProposalShape::Bare(operations)) => Ok(operations),
        Err(e) => Err(ProposerError::Malformed(e.to_string())),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the info string (e.g. `json`) on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
