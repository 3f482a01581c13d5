use geoshift_backend::{Backend, MemoryBackend};
use geoshift_core::{
    Editability, Field, FieldDefinition, FieldType, RuleDescriptor, RuleErrorSpec, RuleKind,
    TableKind, TableSnapshot, TriggerEvent, WorkspaceSnapshot, codes,
};
use geoshift_rules::{RuleAction, RuleError, RuleGroup};

const TABLE: &str = "UDEQ.UICADMIN.UICWell";

fn backend() -> MemoryBackend {
    let fields = vec![
        Field::new("OBJECTID", FieldDefinition::of_type(FieldType::Oid)),
        Field::new("GUID", FieldDefinition::of_type(FieldType::Guid)),
        Field::new("Name", FieldDefinition::of_type(FieldType::Text)),
        Field::new("Status", FieldDefinition::of_type(FieldType::Text)),
        Field::new("CreatedOn", FieldDefinition::of_type(FieldType::Date)),
        Field::new("ModifiedOn", FieldDefinition::of_type(FieldType::Date)),
        Field::new("EditedBy", FieldDefinition::of_type(FieldType::Text)),
    ];
    let mut snapshot = WorkspaceSnapshot::empty("localhost.udeq@uicadmin");
    snapshot
        .tables
        .push(TableSnapshot::new(TABLE, TableKind::FeatureClass, fields));
    MemoryBackend::new(snapshot).expect("valid snapshot")
}

fn rules() -> Vec<RuleDescriptor> {
    vec![
        RuleDescriptor {
            name: "Name Required".to_string(),
            field: "Name".to_string(),
            kind: RuleKind::Constraint,
            expression: "!IsEmpty($feature.Name)".to_string(),
            triggers: vec![TriggerEvent::Insert, TriggerEvent::Update],
            editable: Editability::Editable,
            error: Some(RuleErrorSpec {
                number: 1,
                message: "name is required".to_string(),
            }),
            description: "Name Required".to_string(),
            tags: vec!["uic".to_string()],
        },
        RuleDescriptor {
            name: "Guid".to_string(),
            field: "GUID".to_string(),
            kind: RuleKind::Constant,
            expression: "Guid()".to_string(),
            triggers: vec![TriggerEvent::Insert],
            editable: Editability::NonEditable,
            error: None,
            description: "Guid".to_string(),
            tags: Vec::new(),
        },
    ]
}

fn actions(report: &geoshift_rules::RuleGroupReport) -> Vec<RuleAction> {
    report.actions.iter().map(|outcome| outcome.action).collect()
}

#[test]
fn reconcile_creates_then_updates() {
    let mut backend = backend();
    let rules = rules();
    let group = RuleGroup::new(backend.workspace(), TABLE, &rules);

    let first = group.reconcile(&mut backend).expect("first pass");
    assert_eq!(actions(&first), vec![RuleAction::Created, RuleAction::Created]);

    let second = group.reconcile(&mut backend).expect("second pass");
    assert_eq!(actions(&second), vec![RuleAction::Updated, RuleAction::Updated]);

    let stored = &backend.table(TABLE).expect("table").attribute_rules;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].triggering_fields, vec!["Name", "Status"]);
    assert_eq!(stored[1].rule_type.to_string(), "CALCULATION");
    assert_eq!(group.table_path.file_name().and_then(|name| name.to_str()), Some(TABLE));
}

#[test]
fn probe_branches_directly_to_create_and_alter() {
    let mut backend = backend().with_rule_probe(true);
    backend
        .faults_mut()
        .fail_operation("alter_attribute_rule", None, "ERROR 999001");
    let rules = rules();
    let group = RuleGroup::new(backend.workspace(), TABLE, &rules);

    let first = group.reconcile(&mut backend).expect("probe create");
    assert_eq!(actions(&first), vec![RuleAction::Created, RuleAction::Created]);

    backend.faults_mut().clear();
    let second = group.reconcile(&mut backend).expect("probe alter");
    assert_eq!(actions(&second), vec![RuleAction::Updated, RuleAction::Updated]);
}

#[test]
fn existing_rule_on_create_is_skipped() {
    let mut backend = backend();
    let rules = rules();
    let group = RuleGroup::new(backend.workspace(), TABLE, &rules);
    group.reconcile(&mut backend).expect("seed rules");

    // alter fails for an unrelated reason, so creation runs and hits the existing rule
    backend
        .faults_mut()
        .fail_operation("alter_attribute_rule", None, "ERROR 999001");
    let report = group.reconcile(&mut backend).expect("skip existing");
    assert_eq!(report.count(RuleAction::SkippedExisting), 2);
}

#[test]
fn unclassified_create_failure_aborts_the_group() {
    let mut backend = backend();
    backend
        .faults_mut()
        .fail_operation("add_attribute_rule", None, "ERROR 999001");
    let rules = rules();
    let group = RuleGroup::new(backend.workspace(), TABLE, &rules);

    let err = group.reconcile(&mut backend).expect_err("fatal create");
    match err {
        RuleError::Backend { rule, source, .. } => {
            assert_eq!(rule, "Name Required");
            assert_eq!(source.code, "ERROR 999001");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(backend.table(TABLE).expect("table").attribute_rules.is_empty());
}

#[test]
fn delete_is_idempotent() {
    let mut backend = backend();
    let rules = rules();
    let group = RuleGroup::new(backend.workspace(), TABLE, &rules);
    group.reconcile(&mut backend).expect("seed rules");

    let first = group.delete(&mut backend).expect("delete");
    assert_eq!(actions(&first), vec![RuleAction::Deleted, RuleAction::Deleted]);

    let second = group.delete(&mut backend).expect("delete again");
    assert_eq!(
        actions(&second),
        vec![RuleAction::SkippedMissing, RuleAction::SkippedMissing]
    );
}

#[test]
fn delete_surfaces_unclassified_failures() {
    let mut backend = backend();
    backend
        .faults_mut()
        .fail_operation("delete_attribute_rule", Some(TABLE), codes::INSUFFICIENT_PRIVILEGES);
    let rules = rules();
    let group = RuleGroup::new(backend.workspace(), TABLE, &rules);

    assert!(matches!(
        group.delete(&mut backend),
        Err(RuleError::Backend { .. })
    ));
}

#[test]
fn rules_reach_the_table_through_its_workspace_path() {
    let mut backend = backend();
    let rules = rules();
    let group = RuleGroup::new(r"C:\gis\uic.sde", "UICWell", &rules);
    assert!(group.table_path.to_string_lossy().starts_with(r"C:\gis\uic.sde"));

    let report = group.reconcile(&mut backend).expect("reconcile through path");
    assert_eq!(report.table, "UICWell");
    assert_eq!(report.count(RuleAction::Created), 2);
    assert_eq!(backend.table(TABLE).expect("table").attribute_rules.len(), 2);

    backend
        .faults_mut()
        .fail_operation("delete_attribute_rule", Some(TABLE), "ERROR 999001");
    assert!(matches!(
        group.delete(&mut backend),
        Err(RuleError::Backend { .. })
    ));
}
