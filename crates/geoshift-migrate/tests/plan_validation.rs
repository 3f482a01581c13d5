use std::path::PathBuf;

use geoshift_migrate::{load_plan, plan_json_schema, validate_plan, validate_plan_json};
use serde_json::json;

#[test]
fn fixture_plan_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/migration.json");
    let validated = load_plan(&path).expect("valid plan");

    assert_eq!(validated.plan.field_transfers.len(), 2);
    assert_eq!(
        validated.plan.field_transfers[1].destination_field(),
        "ClassIFacilityType"
    );
    assert!(validated.warnings.is_empty());
}

#[test]
fn schema_rejects_unknown_domain_action() {
    let schema = serde_json::to_value(plan_json_schema()).expect("schema");
    let plan = json!({
        "plan_version": "1",
        "domain_changes": [{ "action": "rename", "domain": "UICCityDomain" }]
    });

    let report = validate_plan_json(&plan, &schema).expect("compile schema");
    assert!(!report.is_ok());
    assert!(
        report
            .errors
            .iter()
            .all(|issue| issue.code == "schema_violation")
    );
}

#[test]
fn semantic_checks_catch_conflicting_entries() {
    let plan = serde_json::from_value(json!({
        "plan_version": "1",
        "tables_to_delete": ["UICToolbox"],
        "skip_tables": ["UICInspection"],
        "table_modifications": [
            { "table": "UICToolbox", "delete_fields": ["Tool"] },
            { "table": "UICInspection", "add_fields": [{ "name": "Notes", "field_type": "text" }] },
            { "table": "UDEQ.UICADMIN.UICInspection" }
        ],
        "domain_changes": [
            { "action": "delete", "domain": "UICWellSubClassDomain" },
            { "action": "add_coded_value", "domain": "uicwellsubclassdomain", "code": 1, "label": "x" }
        ],
        "contingent_groups": [{
            "table": "UICWell",
            "group_name": "Well Class",
            "class_field": "WellClass",
            "subclass_field": "wellclass",
            "domain": "UICWellSubClassDomain"
        }]
    }))
    .expect("parse plan");

    let report = validate_plan(&plan);
    let mut errors: Vec<&str> = report.errors.iter().map(|issue| issue.code.as_str()).collect();
    errors.sort();
    assert_eq!(
        errors,
        vec![
            "adds_to_deleted_domain",
            "contingent_domain_deleted",
            "contingent_fields_identical",
            "duplicate_table_modification",
            "modifies_deleted_table",
        ]
    );

    let mut warnings: Vec<&str> = report
        .warnings
        .iter()
        .map(|issue| issue.code.as_str())
        .collect();
    warnings.sort();
    assert_eq!(warnings, vec!["skipped_table_modified", "text_without_length"]);
}
