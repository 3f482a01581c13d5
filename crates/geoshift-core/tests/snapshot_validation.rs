use geoshift_core::{
    Error, Field, FieldDefinition, FieldType, FieldValue, TableKind, TableSnapshot,
    WorkspaceSnapshot, validate_snapshot,
};

fn well_table() -> TableSnapshot {
    let mut table = TableSnapshot::new(
        "UICWell",
        TableKind::FeatureClass,
        vec![
            Field::new("GUID", FieldDefinition::of_type(FieldType::Guid)),
            Field::new("WellName", FieldDefinition::of_type(FieldType::Text)),
        ],
    );
    table.rows.push(vec![
        FieldValue::Text("{A}".to_string()),
        FieldValue::Text("Well 1".to_string()),
    ]);
    table
}

#[test]
fn accepts_consistent_snapshot() {
    let mut snapshot = WorkspaceSnapshot::empty("local");
    snapshot.tables.push(well_table());
    validate_snapshot(&snapshot).expect("snapshot should validate");
}

#[test]
fn rejects_duplicate_tables_case_insensitively() {
    let mut snapshot = WorkspaceSnapshot::empty("local");
    snapshot.tables.push(well_table());
    let mut duplicate = well_table();
    duplicate.name = "uicwell".to_string();
    snapshot.tables.push(duplicate);

    let err = validate_snapshot(&snapshot).expect_err("duplicate table");
    assert!(err.to_string().contains("duplicate table name"));
}

#[test]
fn rejects_short_rows() {
    let mut snapshot = WorkspaceSnapshot::empty("local");
    let mut table = well_table();
    table.rows.push(vec![FieldValue::Null]);
    snapshot.tables.push(table);

    let err = validate_snapshot(&snapshot).expect_err("short row");
    assert!(err.to_string().contains("row 1 of UICWell"));
}

#[test]
fn rejects_unknown_field_domain() {
    let mut snapshot = WorkspaceSnapshot::empty("local");
    let mut table = well_table();
    table.fields[1].definition.domain = Some("UICMissingDomain".to_string());
    snapshot.tables.push(table);

    let err = validate_snapshot(&snapshot).expect_err("missing domain");
    assert!(err.to_string().contains("UICMissingDomain"));
}

#[test]
fn rejects_unsupported_snapshot_version() {
    let mut snapshot = WorkspaceSnapshot::empty("local");
    snapshot.tables.push(well_table());
    snapshot.snapshot_version = "9.9".to_string();

    let err = validate_snapshot(&snapshot).expect_err("unsupported version");
    assert!(matches!(
        err,
        Error::UnsupportedSnapshotVersion { ref found, .. } if found == "9.9"
    ));
}
