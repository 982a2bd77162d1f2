//! Testing utilities for the DPE workspace
//!
//! Scripted proposers, canned renderers and class-diagram fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use dpe_artifact::{
    ArtifactKey, ContextDocument, DiagramKind, DocumentFlavor, StructuralFlavor, TextDocument,
    TextFlavor, WireOperation,
};
use dpe_core::{parse_proposal, ProposalRequest, Proposer, ProposerError, RenderError, Renderer};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

pub const OWNER: &str = "owner-1";
pub const CONVERSATION: &str = "conversation-1";

pub const CLASS_DESCRIPTION: &str = "@startuml\nclass Payment {\n  +amount: Decimal\n}\n@enduml";

pub fn key(kind: DiagramKind) -> ArtifactKey {
    ArtifactKey::new(OWNER, CONVERSATION, kind)
}

pub fn class_key() -> ArtifactKey {
    key(DiagramKind::Class)
}

pub fn class_context() -> ContextDocument {
    json!({
        "entities": [
            {"name": "Payment", "attributes": [{"name": "amount", "type": "Decimal"}]}
        ],
        "relationships": []
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

pub fn class_description() -> TextDocument {
    TextDocument::from_text(CLASS_DESCRIPTION)
}

/// Operations that create [`class_context`] from nothing
pub fn create_context_ops() -> Vec<WireOperation> {
    vec![WireOperation::add("root", class_context()).with_reasoning("initial model")]
}

/// Operations that create [`class_description`] from nothing
pub fn create_description_ops() -> Vec<WireOperation> {
    vec![WireOperation::add("root", CLASS_DESCRIPTION).with_reasoning("initial diagram")]
}

/// Proposer answering from a queue of canned responses
///
/// When the queue is empty the fallback is returned, or
/// [`ProposerError::Unavailable`] if there is none.
pub struct ScriptedProposer<F: DocumentFlavor> {
    responses: Mutex<VecDeque<Result<Vec<WireOperation>, ProposerError>>>,
    fallback: Option<Vec<WireOperation>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ProposalRequest<F>>>,
}

impl<F: DocumentFlavor> ScriptedProposer<F> {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    #[must_use]
    pub fn then(self, operations: Vec<WireOperation>) -> Self {
        self.responses.lock().push_back(Ok(operations));
        self
    }

    /// Queue a raw backend answer, parsed like a real backend's output
    #[must_use]
    pub fn then_text(self, text: &str) -> Self {
        self.responses.lock().push_back(parse_proposal(text));
        self
    }

    /// Queue a failure
    #[must_use]
    pub fn then_error(self, error: ProposerError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Answer with `operations` once the queue is drained
    #[must_use]
    pub fn with_fallback(mut self, operations: Vec<WireOperation>) -> Self {
        self.fallback = Some(operations);
        self
    }

    /// Sleep before every answer
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<ProposalRequest<F>>
    where
        F: Clone,
    {
        self.requests.lock().clone()
    }
}

impl<F: DocumentFlavor> Default for ScriptedProposer<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<F: DocumentFlavor> Proposer<F> for ScriptedProposer<F> {
    async fn propose(
        &self,
        request: ProposalRequest<F>,
    ) -> Result<Vec<WireOperation>, ProposerError> {
        self.requests.lock().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().pop_front();
        match next {
            Some(response) => response,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ProposerError::Unavailable("script exhausted".into())),
        }
    }
}

pub type ContextScript = ScriptedProposer<StructuralFlavor>;
pub type DescriptionScript = ScriptedProposer<TextFlavor>;

/// Proposer that always fails and counts its calls
#[derive(Debug, Default)]
pub struct FailingProposer {
    calls: AtomicU32,
}

impl FailingProposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F: DocumentFlavor> Proposer<F> for FailingProposer {
    async fn propose(
        &self,
        _request: ProposalRequest<F>,
    ) -> Result<Vec<WireOperation>, ProposerError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Err(ProposerError::Unavailable(format!("backend down (call {n})")))
    }
}

/// Renderer returning fixed bytes
#[derive(Debug, Clone)]
pub struct StaticRenderer(pub Vec<u8>);

#[async_trait]
impl Renderer for StaticRenderer {
    async fn render(&self, _description: &TextDocument) -> Result<Vec<u8>, RenderError> {
        Ok(self.0.clone())
    }
}

/// Renderer that always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingRenderer;

#[async_trait]
impl Renderer for FailingRenderer {
    async fn render(&self, _description: &TextDocument) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Failed {
            code: Some(1),
            stderr: "syntax error".into(),
        })
    }
}
