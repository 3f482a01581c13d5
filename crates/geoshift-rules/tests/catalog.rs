use std::fs;
use std::path::PathBuf;

use geoshift_core::{Editability, RuleKind, TriggerEvent};
use geoshift_rules::{RuleError, load_catalog, load_catalog_value};
use serde_json::json;

fn catalog_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/rules/rules.json")
}

fn issue_codes(err: RuleError) -> Vec<String> {
    match err {
        RuleError::Invalid(report) => report.errors.into_iter().map(|issue| issue.code).collect(),
        other => panic!("expected validation failure, got {other}"),
    }
}

#[test]
fn loads_catalog_with_defaults_and_expression_files() {
    let loaded = load_catalog(&catalog_path()).expect("load catalog");
    let registry = loaded.registry;
    assert_eq!(registry.len(), 2);

    let well = registry.get("UDEQ.UICADMIN.UICWell").expect("well rules");
    let names: Vec<&str> = well.rules.iter().map(|rule| rule.name.as_str()).collect();
    assert_eq!(names, vec!["Well Class", "Well Name", "Guid"]);

    let class = &well.rules[0];
    assert!(class.expression.starts_with("var subclass"));
    assert_eq!(class.triggers, vec![TriggerEvent::Insert, TriggerEvent::Update]);
    assert_eq!(class.error.as_ref().map(|error| error.number), Some(100));
    assert_eq!(class.description, "Well Class");

    let name = &well.rules[1];
    assert_eq!(name.triggers, vec![TriggerEvent::Insert]);
    assert_eq!(name.editable, Editability::Editable);
    assert!(name.tags.is_empty());

    let guid = &well.rules[2];
    assert_eq!(guid.kind, RuleKind::Constant);
    assert_eq!(guid.editable, Editability::NonEditable);
    assert_eq!(guid.description, "assigns a guid on insert");

    assert_eq!(loaded.warnings.len(), 1);
    assert_eq!(loaded.warnings[0].code, "constraint_without_error");
    assert_eq!(loaded.warnings[0].path, "/tables/1/rules/0");
}

#[test]
fn missing_expression_file_names_the_path() {
    let base = std::env::temp_dir().join(format!("geoshift_rules_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&base).expect("create temp dir");
    let catalog = json!({
        "catalog_version": "1",
        "tables": [{
            "table": "UICWell",
            "rules": [{
                "name": "Missing",
                "field": "WellName",
                "kind": "calculation",
                "expression_file": "missing.arcade"
            }]
        }]
    });

    let err = load_catalog_value(&catalog, &base).expect_err("missing file");
    match err {
        RuleError::ExpressionNotFound(path) => assert_eq!(path, base.join("missing.arcade")),
        other => panic!("unexpected error: {other}"),
    }
    fs::remove_dir_all(&base).ok();
}

#[test]
fn rejects_unknown_keys_structurally() {
    let catalog = json!({
        "catalog_version": "1",
        "tables": [{
            "table": "UICWell",
            "rules": [{
                "name": "Typo",
                "field": "WellName",
                "kind": "calculation",
                "expresion": "1"
            }]
        }]
    });

    let codes = issue_codes(load_catalog_value(&catalog, &PathBuf::from(".")).unwrap_err());
    assert!(codes.iter().all(|code| code == "schema_violation"));
    assert!(!codes.is_empty());
}

#[test]
fn reports_semantic_errors_together() {
    let catalog = json!({
        "catalog_version": "1",
        "tables": [
            {
                "table": "UICWell",
                "rules": [
                    { "name": "A", "field": "WellName", "kind": "calculation", "expression": "1" },
                    { "name": "a", "field": "WellName", "kind": "calculation", "expression": "2" },
                    { "name": "B", "field": "WellName", "kind": "calculation" },
                    { "name": "C", "field": "WellName", "kind": "calculation", "expression": "1", "triggers": [] }
                ]
            },
            { "table": "UDEQ.UICADMIN.uicwell", "rules": [] }
        ]
    });

    let mut codes = issue_codes(load_catalog_value(&catalog, &PathBuf::from(".")).unwrap_err());
    codes.sort();
    assert_eq!(
        codes,
        vec!["duplicate_rule", "duplicate_table", "empty_triggers", "missing_expression"]
    );
}
