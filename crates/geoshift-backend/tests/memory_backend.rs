use std::path::PathBuf;

use geoshift_backend::{Backend, MemoryBackend};
use geoshift_core::{
    CodedValue, ErrorOutcome, Field, FieldDefinition, FieldType, FieldValue, codes,
};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/uic_workspace.json")
}

fn open_fixture() -> MemoryBackend {
    MemoryBackend::open(&fixture_path()).expect("load workspace fixture")
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn lists_tables_feature_classes_and_datasets_separately() {
    let mut backend = open_fixture();

    let tables = backend.list_tables().expect("list tables");
    assert_eq!(
        tables,
        names(&["UDEQ.UICADMIN.UICInspection", "UDEQ.UICADMIN.UICToolbox"])
    );

    let top_level = backend.list_feature_classes(None).expect("list root");
    assert_eq!(
        top_level,
        names(&["UDEQ.UICADMIN.UICFacility", "UDEQ.UICADMIN.Counties"])
    );

    let datasets = backend.list_datasets().expect("list datasets");
    assert_eq!(datasets, names(&["UDEQ.UICADMIN.UIC"]));

    let nested = backend
        .list_feature_classes(Some("UDEQ.UICADMIN.UIC"))
        .expect("list dataset");
    assert_eq!(nested, names(&["UDEQ.UICADMIN.UICWell"]));
}

#[test]
fn refuses_schema_changes_on_versioned_tables() {
    let mut backend = open_fixture();
    let field = Field::new("WellDepth", FieldDefinition::of_type(FieldType::Long));

    let err = backend
        .add_field("UICWell", &field)
        .expect_err("versioned table");
    assert_eq!(err.outcome(), ErrorOutcome::Unclassified);

    backend.unregister_as_versioned("UICWell").expect("unversion");
    backend.add_field("UICWell", &field).expect("add field");

    let again = backend
        .add_field("UICWell", &field)
        .expect_err("field exists");
    assert_eq!(again.code, codes::FIELD_ALREADY_EXISTS);
    assert_eq!(again.outcome(), ErrorOutcome::AlreadyApplied);
}

#[test]
fn versioning_toggles_report_idempotent_codes() {
    let mut backend = open_fixture();

    let err = backend
        .register_as_versioned("UICWell")
        .expect_err("already versioned");
    assert_eq!(err.outcome(), ErrorOutcome::AlreadyApplied);

    backend.unregister_as_versioned("UICWell").expect("unversion");
    let err = backend
        .unregister_as_versioned("UICWell")
        .expect_err("already unversioned");
    assert_eq!(err.outcome(), ErrorOutcome::AlreadyRemoved);
}

#[test]
fn versioning_state_follows_registration_and_tracking() {
    let mut backend = open_fixture();

    let state = backend.versioning_state("UDEQ.UICADMIN.UICWell").expect("state");
    assert!(state.versioned);
    assert!(state.fields.is_some());

    backend.unregister_as_versioned("UICWell").expect("unversion");
    backend.disable_editor_tracking("UICWell").expect("disable tracking");
    let state = backend.versioning_state("UICWell").expect("state");
    assert!(!state.versioned);
    assert!(state.fields.is_none());
}

#[test]
fn deleting_missing_fields_still_removes_present_ones() {
    let mut backend = open_fixture();
    backend.unregister_as_versioned("UICFacility").expect("unversion");

    let err = backend
        .delete_fields("UICFacility", &names(&["FRSID", "NotThere"]))
        .expect_err("one field missing");
    assert_eq!(err.outcome(), ErrorOutcome::AlreadyRemoved);

    let table = backend.table("UICFacility").expect("facility table");
    assert!(table.field_index("FRSID").is_none());
    assert!(table.rows.iter().all(|row| row.len() == table.fields.len()));
}

#[test]
fn update_cursor_applies_writes_and_injected_failures() {
    let mut backend = open_fixture();
    backend.faults_mut().fail_row_write("UICWell", 1);

    let fields = names(&["WellName"]);
    let mut failures = 0;
    {
        let mut cursor = backend
            .update_cursor("UICWell", &fields)
            .expect("open cursor");
        while let Some(row) = cursor.next_row() {
            let row = row.expect("read row");
            let renamed = format!("{} (renamed)", row[0]);
            if cursor.update_row(vec![FieldValue::Text(renamed)]).is_err() {
                failures += 1;
            }
        }
    }

    assert_eq!(failures, 1);
    assert_eq!(backend.row_writes(), 3);
    let names = backend
        .search("UICWell", &fields, Some("1=1"))
        .expect("scan");
    assert_eq!(names[0][0], FieldValue::Text("Well A1 (renamed)".to_string()));
    assert_eq!(names[1][0], FieldValue::Text("Well A2".to_string()));
}

#[test]
fn domains_in_use_cannot_be_deleted() {
    let mut backend = open_fixture();

    let err = backend
        .delete_domain("UICCityDomain")
        .expect_err("used by UICToolbox.Tool");
    assert_eq!(err.outcome(), ErrorOutcome::Unclassified);

    backend.delete_table("UICToolbox").expect("delete table");
    backend.delete_domain("UICCityDomain").expect("delete domain");

    let err = backend
        .delete_domain("UICCityDomain")
        .expect_err("already removed");
    assert_eq!(err.outcome(), ErrorOutcome::AlreadyRemoved);
}

#[test]
fn coded_values_are_added_once() {
    let mut backend = open_fixture();
    let value = CodedValue {
        code: FieldValue::Text("WA".to_string()),
        label: "waiting".to_string(),
    };

    backend
        .add_coded_value("UICNoMigrationPetStatusDomain", &value)
        .expect("add value");
    let err = backend
        .add_coded_value("UICNoMigrationPetStatusDomain", &value)
        .expect_err("duplicate");
    assert_eq!(err.outcome(), ErrorOutcome::AlreadyApplied);
}

#[test]
fn append_maps_source_fields_by_name() {
    let mut backend = open_fixture();

    backend.truncate_table("Counties").expect("truncate");
    let appended = backend
        .append("sgid://UtahCountyBoundaries/0", "Counties")
        .expect("append");
    assert_eq!(appended, 2);

    let rows = backend
        .search("Counties", &names(&["NAME", "FIPS"]), None)
        .expect("scan");
    assert_eq!(
        rows,
        vec![
            vec![FieldValue::Text("SALT LAKE".to_string()), FieldValue::Int(35)],
            vec![FieldValue::Text("UTAH".to_string()), FieldValue::Int(49)],
        ]
    );
}

#[test]
fn saves_and_reloads_snapshot() {
    let mut backend = open_fixture();
    backend.delete_table("UICToolbox").expect("delete table");

    let mut path = std::env::temp_dir();
    path.push(format!("geoshift_backend_{}.json", uuid::Uuid::new_v4()));
    backend.save(&path).expect("save snapshot");

    let reloaded = MemoryBackend::open(&path).expect("reload snapshot");
    assert!(reloaded.table("UICToolbox").is_none());
    assert!(reloaded.table("UICWell").is_some());

    let _ = std::fs::remove_file(&path);
}
