use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use geoshift_backend::MemoryBackend;

fn crates_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates dir")
        .to_path_buf()
}

/// Temp project with a workspace snapshot, plan, rule catalog, and config.
fn setup_project() -> PathBuf {
    let root = std::env::temp_dir().join(format!("geoshift_cli_{}", uuid::Uuid::new_v4()));
    let migrate_fixtures = crates_dir().join("geoshift-migrate/tests/fixtures");
    let rules_fixtures = crates_dir().join("geoshift-rules/tests/fixtures/rules");

    fs::create_dir_all(root.join("rules/well")).expect("create project");
    fs::copy(
        migrate_fixtures.join("uic_workspace.json"),
        root.join("workspace.json"),
    )
    .expect("copy workspace");
    fs::copy(
        migrate_fixtures.join("migration.json"),
        root.join("migration.json"),
    )
    .expect("copy plan");
    fs::copy(rules_fixtures.join("rules.json"), root.join("rules/rules.json"))
        .expect("copy catalog");
    fs::copy(
        rules_fixtures.join("well/class.arcade"),
        root.join("rules/well/class.arcade"),
    )
    .expect("copy expression");
    fs::write(
        root.join("geoshift.toml"),
        r#"
default_environment = "local"
run_dir = "runs"

[environments.local]
workspace = "workspace.json"

[[reference]]
table = "Counties"
source = "sgid://UtahCountyBoundaries/0"
"#,
    )
    .expect("write config");
    root
}

fn geoshift(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_geoshift"))
        .arg("--config")
        .arg(root.join("geoshift.toml"))
        .args(args)
        .output()
        .expect("run geoshift")
}

fn run_dirs(root: &Path) -> Vec<PathBuf> {
    match fs::read_dir(root.join("runs")) {
        Ok(entries) => entries
            .map(|entry| entry.expect("dir entry").path())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[test]
fn migrate_then_reconcile_rules() {
    let root = setup_project();

    let output = geoshift(&root, &["migrate"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let runs = run_dirs(&root);
    assert_eq!(runs.len(), 1);
    assert!(runs[0].join("config.json").exists());
    assert!(runs[0].join("report.json").exists());
    let logs = fs::read_to_string(runs[0].join("logs.ndjson")).expect("read logs");
    assert!(logs.contains("run_started"));
    assert!(logs.contains("run_finished"));

    let backend = MemoryBackend::open(&root.join("workspace.json")).expect("reload");
    let well = backend.table("UICWell").expect("well");
    assert!(well.versioned);
    assert!(well.field_index("WellDepth").is_some());

    let output = geoshift(&root, &["rules", "update"]);
    assert!(output.status.success());
    let output = geoshift(&root, &["rules", "update", "--table", "UICWell"]);
    assert!(output.status.success());

    let backend = MemoryBackend::open(&root.join("workspace.json")).expect("reload");
    assert_eq!(
        backend
            .table("UICWell")
            .expect("well")
            .attribute_rules
            .len(),
        3
    );
    assert_eq!(run_dirs(&root).len(), 3);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn unknown_environment_fails_before_any_run() {
    let root = setup_project();
    let before = fs::read(root.join("workspace.json")).expect("read workspace");

    let output = geoshift(&root, &["--env", "prod", "migrate"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown environment 'prod'"));
    assert!(run_dirs(&root).is_empty());
    assert_eq!(fs::read(root.join("workspace.json")).expect("read"), before);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn stop_after_leaves_tables_unversioned() {
    let root = setup_project();

    let output = geoshift(&root, &["migrate", "--stop-after", "unversion"]);
    assert!(output.status.success());
    let backend = MemoryBackend::open(&root.join("workspace.json")).expect("reload");
    assert!(!backend.table("UICWell").expect("well").versioned);

    let output = geoshift(&root, &["migrate"]);
    assert!(output.status.success());
    let backend = MemoryBackend::open(&root.join("workspace.json")).expect("reload");
    assert!(backend.table("UICWell").expect("well").versioned);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn validate_and_schema_do_not_create_runs() {
    let root = setup_project();

    let output = geoshift(&root, &["validate"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("migration.json: ok"));
    assert!(stdout.contains("constraint_without_error"));

    let output = geoshift(&root, &["schema", "plan"]);
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json schema");
    assert!(schema["properties"]["plan_version"].is_object());

    assert!(run_dirs(&root).is_empty());
    fs::remove_dir_all(&root).ok();
}

#[test]
fn refresh_reloads_reference_tables() {
    let root = setup_project();

    let output = geoshift(&root, &["refresh"]);
    assert!(output.status.success());
    let backend = MemoryBackend::open(&root.join("workspace.json")).expect("reload");
    assert_eq!(backend.table("Counties").expect("counties").rows.len(), 2);

    fs::remove_dir_all(&root).ok();
}
