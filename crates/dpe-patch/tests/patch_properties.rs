use dpe_artifact::{ContextDocument, TextDocument, WireOperation};
use dpe_patch::{OpOutcome, Patcher, StructuralPatcher, TextPatcher};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

fn doc(value: Value) -> ContextDocument {
    value.as_object().cloned().unwrap()
}

fn payload() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z]{0,5}".prop_map(Value::String),
        (0i64..100).prop_map(|x| json!({"x": x})),
        prop::collection::vec("[a-z]{1,3}", 0..3).prop_map(|v| json!(v)),
    ]
}

fn context() -> impl Strategy<Value = ContextDocument> {
    (
        prop::collection::vec(payload(), 0..6),
        prop::collection::btree_map("m[0-9]", payload(), 0..4),
    )
        .prop_map(|(items, meta)| {
            let meta: serde_json::Map<String, Value> = meta.into_iter().collect();
            doc(json!({"items": items, "meta": meta}))
        })
}

fn line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("@startuml".to_string()),
        Just("@enduml".to_string()),
        "[a-z {}>-]{0,8}",
    ]
}

fn structural(previous: &ContextDocument, wire: &[WireOperation]) -> ContextDocument {
    StructuralPatcher::new()
        .apply_wire(Some(previous), wire)
        .unwrap()
        .document
}

#[test]
fn test_scenario_root_creation() {
    let out = StructuralPatcher::new()
        .apply_wire(None, &[WireOperation::add("root", json!({"a": [1]}))])
        .unwrap();
    assert_eq!(Value::Object(out.document), json!({"a": [1]}));
}

#[test]
fn test_scenario_append_to_sequence() {
    let previous = doc(json!({"a": [{"x": 1}]}));
    let out = structural(&previous, &[WireOperation::add("a[end]", json!({"x": 2}))]);
    assert_eq!(Value::Object(out), json!({"a": [{"x": 1}, {"x": 2}]}));
}

#[test]
fn test_scenario_insert_after_anchor() {
    let previous = TextDocument::from_lines(
        ["@startuml", "class A {", "}", "@enduml"]
            .map(String::from)
            .to_vec(),
    );
    let out = TextPatcher::new()
        .apply_wire(
            Some(&previous),
            &[WireOperation::insert_lines("(class A {)[1]", "(@enduml)[1]", "  +field")],
        )
        .unwrap();
    assert_eq!(
        out.document.lines(),
        &["@startuml", "class A {", "  +field", "}", "@enduml"]
    );
}

#[test]
fn test_mixed_batch_reports_every_operation() {
    let previous = doc(json!({"entities": [], "relations": []}));
    let out = StructuralPatcher::new()
        .apply_wire(
            Some(&previous),
            &[
                WireOperation::add("entities[end]", json!({"name": "User"})),
                WireOperation::add("entities[end]", json!({"name": "Order"})),
                WireOperation::add("relations[end]", json!({"from": "User", "to": "Order"})),
                WireOperation::delete("entities[7]"),
            ],
        )
        .unwrap();
    assert_eq!(out.report.len(), 4);
    assert_eq!(out.report.warnings().count(), 1);
    assert_eq!(out.document["entities"][1]["name"], "Order");
}

proptest! {
    #[test]
    fn prop_add_then_delete_key_restores(d in context(), key in "k[0-9]", value in payload()) {
        let location = format!("meta.{key}");
        let added = structural(&d, &[WireOperation::add(location.as_str(), value)]);
        let restored = structural(&added, &[WireOperation::delete(location.as_str())]);
        prop_assert_eq!(restored, d);
    }

    #[test]
    fn prop_add_then_delete_index_restores(d in context(), n in 0usize..9, value in payload()) {
        let location = format!("items[{n}]");
        let added = structural(&d, &[WireOperation::add(location.as_str(), value)]);
        let restored = structural(&added, &[WireOperation::delete(location.as_str())]);
        prop_assert_eq!(restored, d);
    }

    #[test]
    fn prop_root_replacement_is_idempotent(d in context(), replacement in context()) {
        let op = WireOperation::add("root", Value::Object(replacement.clone()));
        let once = structural(&d, std::slice::from_ref(&op));
        let twice = structural(&d, &[op.clone(), op]);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once, replacement);
    }

    #[test]
    fn prop_missing_after_anchor_appends(
        lines in prop::collection::vec(line(), 0..12),
        block in prop::collection::vec(line(), 1..4),
    ) {
        let previous = TextDocument::from_lines(lines.clone());
        let block = block.join("\n");
        let out = TextPatcher::new()
            .apply_wire(
                Some(&previous),
                &[WireOperation::insert_lines("(#never#)[1]", "(@enduml)[1]", block.as_str())],
            )
            .unwrap();

        let mut expected = lines;
        expected.extend(block.split('\n').map(str::to_owned));
        prop_assert_eq!(out.document.lines(), expected.as_slice());
        let is_appended = matches!(out.report.entries()[0].outcome, OpOutcome::Appended { .. });
        prop_assert!(is_appended);
    }

    #[test]
    fn prop_deleting_absent_block_is_identity(
        lines in prop::collection::vec(line(), 0..12),
        block in prop::collection::vec(line(), 0..3),
    ) {
        let previous = TextDocument::from_lines(lines);
        let mut block = block;
        block.push("#absent#".to_string());
        let out = TextPatcher::new()
            .apply_wire(Some(&previous), &[WireOperation::delete_lines("", "", block.join("\n"))])
            .unwrap();
        prop_assert_eq!(out.document.to_text(), previous.to_text());
    }
}
