//! Anchor-addressed patching of diagram descriptions
//!
//! Text patching never fails. A missing `after` anchor appends the payload at
//! the end of the document, a missing `before` anchor is informational only,
//! and deleting a block that is not present changes nothing. Each of these is
//! recorded in the [`PatchReport`] and logged.

use crate::error::PatchError;
use crate::patcher::Patcher;
use crate::report::{OpOutcome, PatchReport, Patched};
use dpe_artifact::{split_lines, DescriptionOperation, LineAnchor, TextDocument, TextFlavor};
use tracing::{debug, warn};

/// Patcher for [`TextFlavor`] documents
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPatcher;

impl TextPatcher {
    /// Create a text patcher
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Patcher for TextPatcher {
    type Flavor = TextFlavor;

    fn apply(
        &self,
        previous: Option<&TextDocument>,
        ops: &[DescriptionOperation],
    ) -> Result<Patched<TextDocument>, PatchError> {
        let mut lines = previous.map(|d| d.lines().to_vec()).unwrap_or_default();
        let mut report = PatchReport::new();

        for (index, op) in ops.iter().enumerate() {
            let outcome = match op {
                DescriptionOperation::ReplaceRoot { text, .. } => {
                    lines = split_lines(text);
                    OpOutcome::Replaced
                }
                DescriptionOperation::Insert {
                    after,
                    before,
                    block,
                    ..
                } => insert(&mut lines, after, before, block),
                DescriptionOperation::DeleteBlock { block, .. } => delete_block(&mut lines, block),
            };

            match &outcome {
                OpOutcome::Appended { reason } | OpOutcome::NoOp { reason } => {
                    warn!(index, operation = %op, reason = %reason, "description operation absorbed");
                }
                _ => debug!(index, operation = %op, "description operation applied"),
            }
            report.record(index, op, outcome);
        }

        Ok(Patched {
            document: TextDocument::from_lines(lines),
            report,
        })
    }
}

fn insert(lines: &mut Vec<String>, after: &LineAnchor, before: &LineAnchor, block: &str) -> OpOutcome {
    let payload = split_lines(block);

    let Some(position) = after.locate(lines.as_slice()) else {
        lines.extend(payload);
        return OpOutcome::appended(format!("anchor {after} not found"));
    };

    // The upper bound is informational; insertion is always right after `after`.
    let upper = before.locate(lines.as_slice()).unwrap_or(lines.len());
    if upper <= position {
        debug!(%after, %before, "before anchor does not follow after anchor");
    }

    lines.splice(position + 1..position + 1, payload);
    OpOutcome::Applied
}

fn delete_block(lines: &mut Vec<String>, block: &str) -> OpOutcome {
    let target = split_lines(block);
    let found = lines
        .windows(target.len())
        .position(|window| window == target.as_slice());

    match found {
        Some(start) => {
            lines.drain(start..start + target.len());
            OpOutcome::Applied
        }
        None => OpOutcome::no_op(format!("block of {} line(s) not found", target.len())),
    }
}
