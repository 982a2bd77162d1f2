//! Diagram turn engine
//!
//! One turn edits both documents of one artifact key and commits them as a
//! single new version:
//!
//! 1. Acquire the key's lock and read the head version
//! 2. Context cycle: structural proposer, [`StructuralPatcher`], validation
//! 3. Description cycle: text proposer (told which context operations were
//!    just applied), [`TextPatcher`], validation
//! 4. Commit both documents through the [`VersionLedger`]
//! 5. Render the description, if configured
//!
//! Steps 1 to 4 run under the optional turn timeout. A cycle that exhausts
//! its attempts, or a timeout, leaves the ledger untouched.

use crate::config::EngineConfig;
use crate::error::{AttemptError, EngineError, Stage};
use crate::locks::KeyLocks;
use crate::proposer::{ProposalRequest, Proposer};
use crate::renderer::Renderer;
use crate::retry::{Attempt, Attempted};
use dpe_artifact::{
    ArtifactDraft, ArtifactKey, DiagramArtifact, DocumentFlavor, StructuralFlavor, TextFlavor,
    WireOperation,
};
use dpe_ledger::VersionLedger;
use dpe_patch::{DocumentOf, PatchReport, Patched, Patcher, StructuralPatcher, TextPatcher};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One user turn against one artifact key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub key: ArtifactKey,
    /// Message that triggered the turn, stored on the new version
    pub message_id: String,
    /// Natural-language instruction handed to both proposers
    pub task: String,
    /// Edit the head version instead of starting from empty documents
    pub is_update: bool,
}

impl TurnRequest {
    /// Turn that builds the diagram from scratch
    #[must_use]
    pub fn create(key: ArtifactKey, message_id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            key,
            message_id: message_id.into(),
            task: task.into(),
            is_update: false,
        }
    }

    /// Turn that edits the current head
    #[must_use]
    pub fn update(key: ArtifactKey, message_id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            is_update: true,
            ..Self::create(key, message_id, task)
        }
    }
}

/// What happened to rendering after the commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStatus {
    /// No renderer, or rendering disabled
    Skipped,
    /// Image bytes produced by the renderer
    Rendered(Vec<u8>),
    /// Renderer failed; the version is committed regardless
    Failed(String),
}

/// Result of a committed turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Newly committed version
    pub artifact: DiagramArtifact,
    pub context_report: PatchReport,
    pub description_report: PatchReport,
    /// Operations of the accepted context attempt
    pub context_operations: Vec<WireOperation>,
    /// Operations of the accepted description attempt
    pub description_operations: Vec<WireOperation>,
    pub context_attempts: u32,
    pub description_attempts: u32,
    pub render: RenderStatus,
}

/// Accepted attempt of one generation cycle
struct StageOutput<D> {
    operations: Vec<WireOperation>,
    patched: Patched<D>,
}

/// Everything a turn produces before rendering
struct Committed {
    artifact: DiagramArtifact,
    context: Attempted<StageOutput<DocumentOf<StructuralPatcher>>>,
    description: Attempted<StageOutput<DocumentOf<TextPatcher>>>,
}

/// Runs diagram turns against a version ledger
pub struct DiagramEngine {
    ledger: VersionLedger,
    context_proposer: Arc<dyn Proposer<StructuralFlavor>>,
    description_proposer: Arc<dyn Proposer<TextFlavor>>,
    renderer: Option<Arc<dyn Renderer>>,
    structural: StructuralPatcher,
    text: TextPatcher,
    config: EngineConfig,
    locks: KeyLocks,
}

impl fmt::Debug for DiagramEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagramEngine")
            .field("ledger", &self.ledger)
            .field("renderer", &self.renderer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DiagramEngine {
    /// Create an engine
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if `config` does not validate
    pub fn new(
        ledger: VersionLedger,
        context_proposer: Arc<dyn Proposer<StructuralFlavor>>,
        description_proposer: Arc<dyn Proposer<TextFlavor>>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let structural = StructuralPatcher::new()
            .with_payload_mode(config.payload_mode())
            .with_max_pad_index(config.max_pad_index);
        Ok(Self {
            ledger,
            context_proposer,
            description_proposer,
            renderer: None,
            structural,
            text: TextPatcher::new(),
            config,
            locks: KeyLocks::new(),
        })
    }

    /// With a renderer invoked after each commit
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Underlying ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one turn and commit its result
    ///
    /// # Errors
    /// Returns [`EngineError::Exhausted`] if a cycle runs out of attempts,
    /// [`EngineError::Timeout`] if the turn exceeds its budget, or
    /// [`EngineError::Ledger`] if reading or committing fails. Nothing is
    /// committed in any of these cases.
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutcome, EngineError> {
        info!(key = %request.key, update = request.is_update, "starting turn");

        let committed = match self.config.turn_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.generate_and_commit(&request))
                .await
                .map_err(|_| {
                    let duration_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    warn!(key = %request.key, duration_ms, "turn timed out");
                    EngineError::Timeout { duration_ms }
                })??,
            None => self.generate_and_commit(&request).await?,
        };

        let render = self.render(&committed.artifact).await;
        let Committed {
            artifact,
            context,
            description,
        } = committed;

        Ok(TurnOutcome {
            artifact,
            context_report: context.value.patched.report,
            description_report: description.value.patched.report,
            context_operations: context.value.operations,
            description_operations: description.value.operations,
            context_attempts: context.attempts,
            description_attempts: description.attempts,
            render,
        })
    }

    async fn generate_and_commit(&self, request: &TurnRequest) -> Result<Committed, EngineError> {
        let _guard = self.locks.acquire(&request.key).await;

        let head = if request.is_update {
            let head = self.ledger.latest(&request.key)?;
            if head.is_none() {
                debug!(key = %request.key, "update requested without a head, creating");
            }
            head
        } else {
            None
        };

        let context = self
            .cycle(
                Stage::Context,
                &self.context_proposer,
                &self.structural,
                request,
                head.as_ref().map(DiagramArtifact::context),
                &[],
            )
            .await?;

        let description = self
            .cycle(
                Stage::Description,
                &self.description_proposer,
                &self.text,
                request,
                head.as_ref().map(DiagramArtifact::description),
                &context.value.operations,
            )
            .await?;

        let draft = ArtifactDraft::new(
            request.key.clone(),
            request.message_id.clone(),
            context.value.patched.document.clone(),
            description.value.patched.document.clone(),
        );
        let artifact = self.ledger.commit(draft)?;

        Ok(Committed {
            artifact,
            context,
            description,
        })
    }

    /// Propose, patch and validate one document under the retry policy
    async fn cycle<P: Patcher>(
        &self,
        stage: Stage,
        proposer: &Arc<dyn Proposer<P::Flavor>>,
        patcher: &P,
        request: &TurnRequest,
        previous: Option<&DocumentOf<P>>,
        upstream: &[WireOperation],
    ) -> Result<Attempted<StageOutput<DocumentOf<P>>>, EngineError> {
        let feed_back = self.config.feed_back_validation;

        let accepted = self
            .config
            .retry_policy()
            .run(
                |attempt: Attempt| {
                    let proposal = ProposalRequest::<P::Flavor> {
                        diagram_kind: request.key.diagram_kind,
                        task: request.task.clone(),
                        previous: previous.cloned(),
                        upstream: upstream.to_vec(),
                        attempt: attempt.number,
                        feedback: attempt.feedback.filter(|_| feed_back),
                    };
                    let proposer = Arc::clone(proposer);
                    async move {
                        let operations = proposer.propose(proposal).await?;
                        let patched = patcher.apply_wire(previous, &operations)?;
                        Ok::<_, AttemptError>(StageOutput {
                            operations,
                            patched,
                        })
                    }
                },
                |output: &StageOutput<DocumentOf<P>>| {
                    <P::Flavor as DocumentFlavor>::validate(&output.patched.document)
                },
            )
            .await
            .map_err(|source| EngineError::Exhausted { stage, source })?;

        for warning in accepted.value.patched.report.warnings() {
            warn!(
                %stage,
                index = warning.index,
                operation = %warning.operation,
                outcome = %warning.outcome,
                "operation did not apply exactly"
            );
        }
        debug!(%stage, attempts = accepted.attempts, "cycle accepted");
        Ok(accepted)
    }

    async fn render(&self, artifact: &DiagramArtifact) -> RenderStatus {
        let Some(renderer) = self.renderer.as_ref().filter(|_| self.config.render_after_commit)
        else {
            return RenderStatus::Skipped;
        };
        match renderer.render(artifact.description()).await {
            Ok(bytes) => {
                info!(id = %artifact.id(), bytes = bytes.len(), "rendered diagram");
                RenderStatus::Rendered(bytes)
            }
            Err(e) => {
                warn!(id = %artifact.id(), error = %e, "render failed after commit");
                RenderStatus::Failed(e.to_string())
            }
        }
    }
}
