use dpe_artifact::{ArtifactDraft, ArtifactKey, DiagramKind, TextDocument, Validation};
use dpe_cli::commands::{self, Flavor};
use dpe_core::EngineConfig;
use dpe_ledger::{JsonFileRecordStore, VersionLedger};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_apply_context_from_empty() {
    let dir = tempfile::tempdir().unwrap();
    let ops = write(
        &dir,
        "ops.json",
        r#"[{"operation": "add", "location": "root", "block": {"a": [{"x": 1}]}, "reasoning": ""},
            {"operation": "add", "location": "a[end]", "block": {"x": 2}, "reasoning": ""}]"#,
    );

    let applied = commands::apply_context(None, &ops, &EngineConfig::default()).unwrap();
    let document: Value = serde_json::from_str(&applied.output).unwrap();
    assert_eq!(document, json!({"a": [{"x": 1}, {"x": 2}]}));
    assert!(applied.report.is_clean());
}

#[test]
fn test_apply_context_reports_no_ops() {
    let dir = tempfile::tempdir().unwrap();
    let previous = write(&dir, "context.json", r#"{"a": [1]}"#);
    let ops = write(
        &dir,
        "ops.json",
        r#"{"operations": [{"operation": "delete", "location": "missing.key", "reasoning": "cleanup"}]}"#,
    );

    let applied = commands::apply_context(Some(&previous), &ops, &EngineConfig::default()).unwrap();
    assert_eq!(serde_json::from_str::<Value>(&applied.output).unwrap(), json!({"a": [1]}));
    assert_eq!(applied.report.warnings().count(), 1);
}

#[test]
fn test_apply_context_aborts_on_malformed_location() {
    let dir = tempfile::tempdir().unwrap();
    let ops = write(
        &dir,
        "ops.json",
        r#"[{"operation": "add", "location": "a[x]", "block": {"b": 1}}]"#,
    );
    let err = commands::apply_context(None, &ops, &EngineConfig::default()).unwrap_err();
    assert!(err.to_string().contains("context batch aborted"));
}

#[test]
fn test_apply_text_inserts_after_anchor() {
    let dir = tempfile::tempdir().unwrap();
    let previous = write(&dir, "diagram.puml", "@startuml\nclass A {\n}\n@enduml");
    let ops = write(
        &dir,
        "ops.json",
        r#"[{"operation": "add", "location": {"after_line": "(class A {)[1]", "before_line": "(@enduml)[1]"}, "block": "  +field", "reasoning": ""}]"#,
    );

    let applied = commands::apply_text(Some(&previous), &ops).unwrap();
    assert_eq!(applied.output, "@startuml\nclass A {\n  +field\n}\n@enduml");
}

#[test]
fn test_validate_both_flavors() {
    let dir = tempfile::tempdir().unwrap();
    let empty = write(&dir, "empty.json", "{}");
    let text = write(&dir, "ok.puml", "@startuml\nclass A\n@enduml\n");
    let reversed = write(&dir, "bad.puml", "@enduml\nclass A\n@startuml\n");

    assert!(matches!(
        commands::validate(Flavor::Context, &empty).unwrap(),
        Validation::Failed(_)
    ));
    assert_eq!(commands::validate(Flavor::Text, &text).unwrap(), Validation::Passed);
    assert!(!commands::validate(Flavor::Text, &reversed).unwrap().is_passed());
}

#[test]
fn test_history_lists_versions() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let key = ArtifactKey::new("owner", "conv", DiagramKind::Sequence);
    {
        let ledger = VersionLedger::new(Arc::new(JsonFileRecordStore::open(&store_path).unwrap()));
        for n in 0..2 {
            ledger
                .commit(ArtifactDraft::new(
                    key.clone(),
                    format!("m{n}"),
                    json!({"n": n}).as_object().cloned().unwrap(),
                    TextDocument::from("@startuml\nA -> B\n@enduml"),
                ))
                .unwrap();
        }
    }

    let listing = commands::history(&store_path, &key, false).unwrap();
    let lines: Vec<_> = listing.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("v1"));
    assert!(lines[1].contains("message=m1"));

    let other = ArtifactKey::new("owner", "conv", DiagramKind::Class);
    assert_eq!(
        commands::history(&store_path, &other, false).unwrap(),
        "no versions for owner/conv/class\n"
    );

    let records: Value = serde_json::from_str(&commands::history(&store_path, &key, true).unwrap()).unwrap();
    assert_eq!(records.as_array().map(Vec::len), Some(2));
}
