//! Command implementations
//!
//! Each command returns its output instead of printing, so `main` owns the
//! process streams and exit codes.

use anyhow::{Context, Result};
use dpe_artifact::{
    ArtifactKey, ContextDocument, DiagramArtifact, DocumentFlavor, StructuralFlavor, TextDocument,
    TextFlavor, Validation, WireOperation,
};
use dpe_core::{parse_proposal, CommandRenderer, EngineConfig, Renderer};
use dpe_ledger::{JsonFileRecordStore, VersionLedger};
use dpe_patch::{PatchReport, Patcher, StructuralPatcher, TextPatcher};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Document flavor selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Flavor {
    /// JSON context mapping
    Context,
    /// PlantUML description
    Text,
}

/// Patched document ready to print
#[derive(Debug)]
pub struct Applied {
    pub output: String,
    pub report: PatchReport,
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_operations(path: &Path) -> Result<Vec<WireOperation>> {
    parse_proposal(&read(path)?)
        .with_context(|| format!("{} does not hold a list of operations", path.display()))
}

fn read_context(path: &Path) -> Result<ContextDocument> {
    serde_json::from_str(&read(path)?)
        .with_context(|| format!("{} is not a JSON mapping", path.display()))
}

/// Apply context operations from `ops` to the mapping in `previous`
///
/// # Errors
/// Returns error if a file cannot be read or the batch aborts
pub fn apply_context(
    previous: Option<&Path>,
    ops: &Path,
    config: &EngineConfig,
) -> Result<Applied> {
    let previous = previous.map(read_context).transpose()?;
    let operations = read_operations(ops)?;

    let patcher = StructuralPatcher::new()
        .with_payload_mode(config.payload_mode())
        .with_max_pad_index(config.max_pad_index);
    let patched = patcher
        .apply_wire(previous.as_ref(), &operations)
        .context("context batch aborted")?;

    info!(operations = operations.len(), "applied context operations");
    Ok(Applied {
        output: serde_json::to_string_pretty(&patched.document)?,
        report: patched.report,
    })
}

/// Apply description operations from `ops` to the text in `previous`
///
/// # Errors
/// Returns error if a file cannot be read or an operation does not decode
pub fn apply_text(previous: Option<&Path>, ops: &Path) -> Result<Applied> {
    let previous = previous
        .map(|path| read(path).map(TextDocument::from))
        .transpose()?;
    let operations = read_operations(ops)?;

    let patched = TextPatcher::new()
        .apply_wire(previous.as_ref(), &operations)
        .context("description batch rejected")?;

    info!(operations = operations.len(), "applied description operations");
    Ok(Applied {
        output: patched.document.to_text(),
        report: patched.report,
    })
}

/// Check a document file against its flavor's rules
///
/// # Errors
/// Returns error if the file cannot be read or a context file is not JSON
pub fn validate(flavor: Flavor, file: &Path) -> Result<Validation> {
    Ok(match flavor {
        Flavor::Context => StructuralFlavor::validate(&read_context(file)?),
        Flavor::Text => TextFlavor::validate(&TextDocument::from(read(file)?)),
    })
}

/// List the versions stored for one key
///
/// # Errors
/// Returns error if the store cannot be opened or serialized
pub fn history(store: &Path, key: &ArtifactKey, json: bool) -> Result<String> {
    let store = JsonFileRecordStore::open(store)
        .with_context(|| format!("failed to open store {}", store.display()))?;
    let versions = VersionLedger::new(Arc::new(store)).history(key)?;

    if json {
        return Ok(serde_json::to_string_pretty(&versions)?);
    }
    Ok(format_history(key, &versions))
}

fn format_history(key: &ArtifactKey, versions: &[DiagramArtifact]) -> String {
    if versions.is_empty() {
        return format!("no versions for {key}\n");
    }
    let mut out = String::new();
    for artifact in versions {
        let _ = writeln!(
            out,
            "v{:<3} {}  {}  message={}  context={}  description={}",
            artifact.version(),
            artifact.id(),
            artifact.created_at().format("%Y-%m-%d %H:%M:%S"),
            artifact.message_id(),
            artifact.context_digest().short(),
            artifact.description_digest().short(),
        );
    }
    out
}

/// Render a description file with a PlantUML jar
///
/// # Errors
/// Returns error if the file cannot be read or rendering fails
pub async fn render(jar: &Path, file: &Path, timeout: Duration) -> Result<Vec<u8>> {
    let description = TextDocument::from(read(file)?);
    CommandRenderer::plantuml(jar)
        .with_timeout(timeout)
        .render(&description)
        .await
        .with_context(|| format!("failed to render {}", file.display()))
}
