//! Path-addressed patching of context mappings
//!
//! Semantics per terminal step `(key, index)`:
//!
//! | op     | index   | effect                                                 |
//! |--------|---------|--------------------------------------------------------|
//! | add    | none    | `current[key] = payload`                               |
//! | add    | `end`   | append to `current[key]`, creating the sequence        |
//! | add    | `N`     | insert at `N` when `N <= len`, otherwise no-op         |
//! | delete | none    | remove `key` if present                                |
//! | delete | `N`     | remove element `N` if `N < len`                        |
//! | delete | `end`   | no-op                                                  |
//!
//! Intermediate steps of an `add` auto-create mappings and sequences, padding
//! sequences with empty mappings up to a numeric index. Intermediate steps of
//! a `delete` never create anything; a missing parent makes it a no-op.

use crate::error::PatchError;
use crate::patcher::Patcher;
use crate::report::{OpOutcome, PatchReport, Patched};
use dpe_artifact::{
    ContextDocument, ContextOperation, LocationPath, PayloadMode, Step, StepIndex,
    StructuralFlavor,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Default upper bound on a numeric intermediate index
pub const DEFAULT_MAX_PAD_INDEX: usize = 4096;

/// Patcher for [`StructuralFlavor`] documents
#[derive(Debug, Clone)]
pub struct StructuralPatcher {
    payload_mode: PayloadMode,
    max_pad_index: usize,
}

impl StructuralPatcher {
    /// Patcher that normalizes stringified payloads
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload_mode: PayloadMode::Normalize,
            max_pad_index: DEFAULT_MAX_PAD_INDEX,
        }
    }

    /// Set payload handling
    #[inline]
    #[must_use]
    pub fn with_payload_mode(mut self, mode: PayloadMode) -> Self {
        self.payload_mode = mode;
        self
    }

    /// Set the padding limit for numeric intermediate indexes
    #[inline]
    #[must_use]
    pub fn with_max_pad_index(mut self, limit: usize) -> Self {
        self.max_pad_index = limit;
        self
    }

    fn add(
        &self,
        document: &mut ContextDocument,
        path: &LocationPath,
        payload: Value,
        index: usize,
    ) -> Result<OpOutcome, PatchError> {
        let mut current = document;
        for step in path.parents() {
            current = self.descend(current, step, path, index)?;
        }

        let terminal = path.terminal();
        let key = terminal.name();
        match terminal.index() {
            None => {
                current.insert(key.to_string(), payload);
                Ok(OpOutcome::Applied)
            }
            Some(StepIndex::End) => {
                let slot = current
                    .entry(key)
                    .or_insert_with(|| Value::Array(Vec::new()));
                match slot {
                    Value::Array(seq) => {
                        seq.push(payload);
                        Ok(OpOutcome::Applied)
                    }
                    other => Err(shape_mismatch(index, path, terminal, "sequence", other)),
                }
            }
            Some(StepIndex::At(n)) => match current.get_mut(key) {
                Some(Value::Array(seq)) if n <= seq.len() => {
                    seq.insert(n, payload);
                    Ok(OpOutcome::Applied)
                }
                Some(Value::Array(seq)) => Ok(OpOutcome::no_op(format!(
                    "index {n} beyond length {}",
                    seq.len()
                ))),
                Some(other) => Err(shape_mismatch(index, path, terminal, "sequence", other)),
                None if n == 0 => {
                    current.insert(key.to_string(), Value::Array(vec![payload]));
                    Ok(OpOutcome::Applied)
                }
                None => Ok(OpOutcome::no_op(format!("index {n} beyond length 0"))),
            },
        }
    }

    fn descend<'a>(
        &self,
        current: &'a mut Map<String, Value>,
        step: &Step,
        path: &LocationPath,
        index: usize,
    ) -> Result<&'a mut Map<String, Value>, PatchError> {
        let Some(step_index) = step.index() else {
            let slot = current
                .entry(step.name())
                .or_insert_with(|| Value::Object(Map::new()));
            return match slot {
                Value::Object(map) => Ok(map),
                other => Err(shape_mismatch(index, path, step, "mapping", other)),
            };
        };

        let slot = current
            .entry(step.name())
            .or_insert_with(|| Value::Array(Vec::new()));
        let seq = match slot {
            Value::Array(seq) => seq,
            other => return Err(shape_mismatch(index, path, step, "sequence", other)),
        };

        let position = match step_index {
            StepIndex::End => {
                seq.push(Value::Object(Map::new()));
                seq.len() - 1
            }
            StepIndex::At(n) => {
                if n > self.max_pad_index {
                    return Err(PatchError::PadLimitExceeded {
                        index,
                        location: path.to_string(),
                        requested: n,
                        limit: self.max_pad_index,
                    });
                }
                if seq.len() <= n {
                    seq.resize_with(n + 1, || Value::Object(Map::new()));
                }
                n
            }
        };

        match &mut seq[position] {
            Value::Object(map) => Ok(map),
            other => Err(shape_mismatch(index, path, step, "mapping", other)),
        }
    }
}

impl Default for StructuralPatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Patcher for StructuralPatcher {
    type Flavor = StructuralFlavor;

    fn apply(
        &self,
        previous: Option<&ContextDocument>,
        ops: &[ContextOperation],
    ) -> Result<Patched<ContextDocument>, PatchError> {
        let mut document = previous.cloned().unwrap_or_default();
        let mut report = PatchReport::new();

        for (index, op) in ops.iter().enumerate() {
            let outcome = match op {
                ContextOperation::ReplaceRoot {
                    document: replacement,
                    ..
                } => {
                    document = replacement.clone();
                    OpOutcome::Replaced
                }
                ContextOperation::Add { path, payload, .. } => {
                    self.add(&mut document, path, payload.value().clone(), index)?
                }
                ContextOperation::Delete { path, .. } => delete(&mut document, path),
            };

            match &outcome {
                OpOutcome::NoOp { reason } => {
                    warn!(index, operation = %op, reason = %reason, "context operation had no effect");
                }
                _ => debug!(index, operation = %op, "context operation applied"),
            }
            report.record(index, op, outcome);
        }

        Ok(Patched { document, report })
    }

    fn payload_mode(&self) -> PayloadMode {
        self.payload_mode
    }
}

fn delete(document: &mut ContextDocument, path: &LocationPath) -> OpOutcome {
    let mut current = document;
    for step in path.parents() {
        match resolve(current, step) {
            Some(next) => current = next,
            None => return OpOutcome::no_op(format!("parent '{step}' not found")),
        }
    }

    let terminal = path.terminal();
    let key = terminal.name();
    match terminal.index() {
        None => match current.shift_remove(key) {
            Some(_) => OpOutcome::Applied,
            None => OpOutcome::no_op(format!("key '{key}' absent")),
        },
        Some(StepIndex::At(n)) => match current.get_mut(key) {
            Some(Value::Array(seq)) if n < seq.len() => {
                seq.remove(n);
                OpOutcome::Applied
            }
            Some(Value::Array(seq)) => {
                OpOutcome::no_op(format!("index {n} beyond length {}", seq.len()))
            }
            _ => OpOutcome::no_op(format!("'{key}' is not a sequence")),
        },
        Some(StepIndex::End) => OpOutcome::no_op("delete does not target end"),
    }
}

fn resolve<'a>(current: &'a mut Map<String, Value>, step: &Step) -> Option<&'a mut Map<String, Value>> {
    let slot = current.get_mut(step.name())?;
    let slot = match step.index() {
        None => slot,
        Some(StepIndex::At(n)) => slot.as_array_mut()?.get_mut(n)?,
        Some(StepIndex::End) => slot.as_array_mut()?.last_mut()?,
    };
    slot.as_object_mut()
}

fn shape_mismatch(
    index: usize,
    path: &LocationPath,
    step: &Step,
    expected: &'static str,
    found: &Value,
) -> PatchError {
    PatchError::ShapeMismatch {
        index,
        location: path.to_string(),
        step: step.to_string(),
        expected,
        found: type_name(found),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpe_artifact::WireOperation;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> ContextDocument {
        value.as_object().cloned().unwrap()
    }

    fn run(previous: Option<Value>, wire: &[WireOperation]) -> Patched<ContextDocument> {
        let previous = previous.map(doc);
        StructuralPatcher::new()
            .apply_wire(previous.as_ref(), wire)
            .unwrap()
    }

    #[test]
    fn root_replaces_everything() {
        let out = run(
            Some(json!({"old": true})),
            &[WireOperation::add("root", json!({"a": [1]}))],
        );
        assert_eq!(Value::Object(out.document), json!({"a": [1]}));
        assert_eq!(out.report.entries()[0].outcome, OpOutcome::Replaced);
    }

    #[test]
    fn repeated_root_last_write_wins() {
        let out = run(
            None,
            &[
                WireOperation::add("root", json!({"a": 1})),
                WireOperation::add("root", json!({"b": 2})),
            ],
        );
        assert_eq!(Value::Object(out.document), json!({"b": 2}));
    }

    #[test]
    fn add_plain_key_overwrites() {
        let out = run(
            Some(json!({"title": "old", "n": {"x": 1}})),
            &[WireOperation::add("title", "new"), WireOperation::add("n.x", json!([2]))],
        );
        assert_eq!(Value::Object(out.document), json!({"title": "new", "n": {"x": [2]}}));
    }

    #[test]
    fn add_creates_intermediate_containers() {
        let out = run(None, &[WireOperation::add("a.b[1].c", "v")]);
        assert_eq!(
            Value::Object(out.document),
            json!({"a": {"b": [{}, {"c": "v"}]}})
        );
    }

    #[test]
    fn intermediate_end_appends_a_fresh_mapping() {
        let out = run(
            Some(json!({"entities": [{"name": "A"}]})),
            &[WireOperation::add("entities[end].name", "B")],
        );
        assert_eq!(
            Value::Object(out.document),
            json!({"entities": [{"name": "A"}, {"name": "B"}]})
        );
    }

    #[test]
    fn insert_at_index_within_bounds() {
        let out = run(
            Some(json!({"a": ["x", "z"]})),
            &[WireOperation::add("a[1]", "y"), WireOperation::add("a[3]", "end")],
        );
        assert_eq!(Value::Object(out.document), json!({"a": ["x", "y", "z", "end"]}));
        assert!(out.report.is_clean());
    }

    #[test]
    fn out_of_range_insert_is_reported_no_op() {
        let before = json!({"a": ["x"]});
        let out = run(Some(before.clone()), &[WireOperation::add("a[5]", "y")]);
        assert_eq!(Value::Object(out.document), before);
        assert!(matches!(out.report.entries()[0].outcome, OpOutcome::NoOp { .. }));
    }

    #[test]
    fn insert_at_zero_creates_missing_sequence() {
        let out = run(None, &[WireOperation::add("tags[0]", "first")]);
        assert_eq!(Value::Object(out.document), json!({"tags": ["first"]}));

        let out = run(None, &[WireOperation::add("tags[2]", "third")]);
        assert!(out.document.is_empty());
    }

    #[test]
    fn delete_variants() {
        let out = run(
            Some(json!({"a": [1, 2, 3], "b": {"c": 1, "d": 2}, "e": 0})),
            &[
                WireOperation::delete("a[1]"),
                WireOperation::delete("b.c"),
                WireOperation::delete("a[end]"),
                WireOperation::delete("missing"),
                WireOperation::delete("a[9]"),
            ],
        );
        assert_eq!(Value::Object(out.document), json!({"a": [1, 3], "b": {"d": 2}, "e": 0}));
        let outcomes: Vec<bool> = out.report.entries().iter().map(|e| e.outcome.is_exact()).collect();
        assert_eq!(outcomes, vec![true, true, false, false, false]);
    }

    #[test]
    fn delete_preserves_key_order() {
        let out = run(Some(json!({"x": 1, "y": 2, "z": 3})), &[WireOperation::delete("x")]);
        let keys: Vec<&String> = out.document.keys().collect();
        assert_eq!(keys, vec!["y", "z"]);
    }

    #[test]
    fn delete_never_creates_parents() {
        let out = run(Some(json!({"k": 1})), &[WireOperation::delete("a.b[0].c")]);
        assert_eq!(Value::Object(out.document), json!({"k": 1}));
    }

    #[test]
    fn stringified_payloads_are_normalized() {
        let out = run(None, &[WireOperation::add("entities[end]", r#"{"name": "A"}"#)]);
        assert_eq!(Value::Object(out.document), json!({"entities": [{"name": "A"}]}));

        let verbatim = StructuralPatcher::new().with_payload_mode(PayloadMode::Verbatim);
        let out = verbatim
            .apply_wire(None, &[WireOperation::add("entities[end]", r#"{"name": "A"}"#)])
            .unwrap();
        assert_eq!(
            Value::Object(out.document),
            json!({"entities": [r#"{"name": "A"}"#]})
        );
    }

    #[test]
    fn shape_mismatch_aborts_batch() {
        let previous = doc(json!({"a": "scalar"}));
        let err = StructuralPatcher::new()
            .apply_wire(
                Some(&previous),
                &[WireOperation::add("b", "ok"), WireOperation::add("a[end]", "x")],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PatchError::ShapeMismatch { index: 1, expected: "sequence", found: "string", .. }
        ));
    }

    #[test]
    fn pad_limit_is_enforced() {
        let err = StructuralPatcher::new()
            .with_max_pad_index(10)
            .apply_wire(None, &[WireOperation::add("a[11].b", "x")])
            .unwrap_err();
        assert!(matches!(err, PatchError::PadLimitExceeded { requested: 11, limit: 10, .. }));

        let previous = doc(json!({"keep": 1}));
        let err = StructuralPatcher::new()
            .apply_wire(
                Some(&previous),
                &[
                    WireOperation::add("kept", "x"),
                    WireOperation::add("a[5000].b", "x"),
                ],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PatchError::PadLimitExceeded { index: 1, requested: 5000, limit: DEFAULT_MAX_PAD_INDEX, .. }
        ));
        assert_eq!(previous, doc(json!({"keep": 1})));
    }

    #[test]
    fn decode_errors_carry_operation_index() {
        let err = StructuralPatcher::new()
            .apply_wire(
                None,
                &[WireOperation::add("root", json!({"a": 1})), WireOperation::add("root", json!([1]))],
            )
            .unwrap_err();
        assert_eq!(err.operation_index(), 1);
        assert!(err.is_decode());
    }

    #[test]
    fn previous_document_is_not_mutated() {
        let previous = doc(json!({"a": [1]}));
        let _ = StructuralPatcher::new()
            .apply_wire(Some(&previous), &[WireOperation::add("a[end]", json!({"x": 2}))])
            .unwrap();
        assert_eq!(Value::Object(previous), json!({"a": [1]}));
    }
}
