//! Per-operation patch reports
//!
//! Patchers absorb a number of conditions (anchor misses, out-of-range
//! inserts, deletes of absent keys) instead of failing. The report records
//! each of them so callers can surface warnings without changing semantics.

use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// What happened to one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OpOutcome {
    /// Whole document replaced
    Replaced,
    /// Applied at the addressed location
    Applied,
    /// Anchor not found, payload appended at the end instead
    Appended { reason: String },
    /// Nothing changed
    NoOp { reason: String },
}

impl OpOutcome {
    /// Outcome for an absorbed anchor miss
    #[must_use]
    pub fn appended(reason: impl Into<String>) -> Self {
        Self::Appended {
            reason: reason.into(),
        }
    }

    /// Outcome for an operation that changed nothing
    #[must_use]
    pub fn no_op(reason: impl Into<String>) -> Self {
        Self::NoOp {
            reason: reason.into(),
        }
    }

    /// Whether the operation landed where it was addressed
    #[inline]
    #[must_use]
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Replaced | Self::Applied)
    }
}

impl Display for OpOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replaced => f.write_str("replaced"),
            Self::Applied => f.write_str("applied"),
            Self::Appended { reason } => write!(f, "appended ({reason})"),
            Self::NoOp { reason } => write!(f, "no-op ({reason})"),
        }
    }
}

/// Entry for one operation in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpRecord {
    /// Position in the batch
    pub index: usize,
    /// Human-readable operation summary
    pub operation: String,
    #[serde(flatten)]
    pub outcome: OpOutcome,
}

/// Outcomes of a whole batch, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PatchReport {
    entries: Vec<OpRecord>,
}

impl PatchReport {
    /// Empty report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of operation `index`
    pub fn record(&mut self, index: usize, operation: impl Display, outcome: OpOutcome) {
        self.entries.push(OpRecord {
            index,
            operation: operation.to_string(),
            outcome,
        });
    }

    /// All entries
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[OpRecord] {
        &self.entries
    }

    /// Entries that did not land exactly where addressed
    pub fn warnings(&self) -> impl Iterator<Item = &OpRecord> {
        self.entries.iter().filter(|e| !e.outcome.is_exact())
    }

    /// Every operation landed exactly
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings().next().is_none()
    }

    /// Number of recorded operations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No operations recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Patched document together with its report
#[derive(Debug, Clone, PartialEq)]
pub struct Patched<D> {
    pub document: D,
    pub report: PatchReport,
}

impl<D> Patched<D> {
    /// Split into parts
    #[inline]
    pub fn into_parts(self) -> (D, PatchReport) {
        (self.document, self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_skip_exact_outcomes() {
        let mut report = PatchReport::new();
        report.record(0, "add @ root", OpOutcome::Replaced);
        report.record(1, "add @ a[9]", OpOutcome::no_op("index 9 beyond length 0"));
        report.record(2, "add @ b", OpOutcome::Applied);

        assert_eq!(report.len(), 3);
        assert!(!report.is_clean());
        let warnings: Vec<_> = report.warnings().map(|e| e.index).collect();
        assert_eq!(warnings, vec![1]);
    }

    #[test]
    fn serializes_flat_entries() {
        let mut report = PatchReport::new();
        report.record(0, "delete @ a", OpOutcome::no_op("key absent"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"index": 0, "operation": "delete @ a", "outcome": "no_op", "reason": "key absent"}
            ])
        );
    }
}
