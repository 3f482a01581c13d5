use std::path::PathBuf;

use geoshift_backend::MemoryBackend;
use geoshift_core::FieldValue;
use geoshift_migrate::{MigrationError, ReferenceSource, RefreshStatus, refresh_reference};

fn open_workspace() -> MemoryBackend {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/uic_workspace.json");
    MemoryBackend::open(&path).expect("load workspace fixture")
}

fn counties() -> ReferenceSource {
    ReferenceSource {
        table: "Counties".to_string(),
        source: "sgid://UtahCountyBoundaries/0".to_string(),
    }
}

#[test]
fn replaces_reference_rows_from_source() {
    let mut backend = open_workspace();

    let report = refresh_reference(&mut backend, &[counties()]).expect("refresh");
    assert_eq!(report.failure_count(), 0);
    assert_eq!(report.tables[0].rows, 2);

    let table = backend.table("Counties").expect("counties");
    let names: Vec<&FieldValue> = table.rows.iter().map(|row| &row[1]).collect();
    assert_eq!(
        names,
        vec![&FieldValue::from("SALT LAKE"), &FieldValue::from("UTAH")]
    );
    assert_eq!(table.rows[0][0], FieldValue::Null);
}

#[test]
fn denied_lock_refreshes_nothing() {
    let mut backend = open_workspace();
    backend.faults_mut().deny_lock("Counties");

    let err = refresh_reference(&mut backend, &[counties()]).expect_err("lock denied");
    assert!(matches!(err, MigrationError::LockUnavailable(_)));
    assert_eq!(backend.table("Counties").expect("counties").rows.len(), 1);
}

#[test]
fn unknown_source_is_a_per_table_failure() {
    let mut backend = open_workspace();
    let sources = vec![
        ReferenceSource {
            table: "Counties".to_string(),
            source: "sgid://Missing/0".to_string(),
        },
        counties(),
    ];

    let report = refresh_reference(&mut backend, &sources).expect("refresh");
    assert_eq!(report.tables[0].status, RefreshStatus::AppendFailed);
    assert_eq!(report.tables[1].status, RefreshStatus::Refreshed);
    assert_eq!(report.failure_count(), 1);
}
