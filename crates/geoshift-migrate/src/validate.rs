use std::collections::HashSet;
use std::fs;
use std::path::Path;

use geoshift_core::{FieldType, IssueSeverity, ValidationIssue, ValidationReport, unqualified};
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::PLAN_VERSION;
use crate::errors::{MigrationError, Result};
use crate::model::{DomainChangeSpec, MigrationPlan};
use crate::schema::plan_json_schema;

/// Validated plan with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    pub plan: MigrationPlan,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a plan JSON document against the plan JSON Schema.
pub fn validate_plan_json(plan_json: &Value, plan_schema: &Value) -> Result<ValidationReport> {
    let compiled =
        JSONSchema::compile(plan_schema).map_err(|err| MigrationError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();
    if let Err(errors) = compiled.validate(plan_json) {
        for error in errors {
            let path = error.instance_path.to_string();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                if path.is_empty() { "/".to_string() } else { path },
                error.to_string(),
                None,
            ));
        }
    }
    Ok(report)
}

/// Read, structurally validate, and semantically validate `migration.json`.
pub fn load_plan(path: &Path) -> Result<ValidatedPlan> {
    let contents = fs::read_to_string(path)?;
    let json: Value = serde_json::from_str(&contents)?;
    let schema = serde_json::to_value(plan_json_schema())?;

    let mut report = validate_plan_json(&json, &schema)?;
    if !report.is_ok() {
        return Err(MigrationError::InvalidPlan(report));
    }

    let plan: MigrationPlan = serde_json::from_value(json)?;
    report.merge(validate_plan(&plan));
    if !report.is_ok() {
        return Err(MigrationError::InvalidPlan(report));
    }

    Ok(ValidatedPlan {
        plan,
        warnings: report.warnings,
    })
}

/// Semantic checks over a parsed plan.
pub fn validate_plan(plan: &MigrationPlan) -> ValidationReport {
    let mut report = ValidationReport::default();

    if plan.plan_version != PLAN_VERSION {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "unsupported_plan_version",
            "/plan_version",
            format!("plan version '{}' is not supported", plan.plan_version),
            Some(format!("use plan_version = \"{PLAN_VERSION}\"")),
        ));
    }

    let deleted: HashSet<String> = plan.tables_to_delete.iter().map(|table| key(table)).collect();

    let mut modified = HashSet::new();
    for (index, change) in plan.table_modifications.iter().enumerate() {
        let path = format!("/table_modifications/{index}");
        if !modified.insert(key(&change.table)) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "duplicate_table_modification",
                format!("{path}/table"),
                format!("table '{}' is modified more than once", change.table),
                Some("merge the field lists into one entry".to_string()),
            ));
        }
        if deleted.contains(&key(&change.table)) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "modifies_deleted_table",
                format!("{path}/table"),
                format!("table '{}' is deleted before it is modified", change.table),
                None,
            ));
        }
        for (field_index, field) in change.add_fields.iter().enumerate() {
            if field.field_type() == FieldType::Text && field.definition.length.is_none() {
                report.push_warning(ValidationIssue::new(
                    IssueSeverity::Warning,
                    "text_without_length",
                    format!("{path}/add_fields/{field_index}"),
                    format!("text field '{}' has no length", field.name),
                    Some("the backend default length applies".to_string()),
                ));
            }
        }
    }

    let removed_domains: HashSet<String> = plan
        .domain_changes
        .iter()
        .filter(|change| matches!(change, DomainChangeSpec::Delete { .. }))
        .map(|change| change.domain().to_ascii_lowercase())
        .collect();
    for (index, change) in plan.domain_changes.iter().enumerate() {
        if matches!(change, DomainChangeSpec::AddCodedValue { .. })
            && removed_domains.contains(&change.domain().to_ascii_lowercase())
        {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "adds_to_deleted_domain",
                format!("/domain_changes/{index}"),
                format!("domain '{}' is deleted before values are added", change.domain()),
                None,
            ));
        }
    }

    for (index, spec) in plan.field_transfers.iter().enumerate() {
        let path = format!("/field_transfers/{index}");
        if key(&spec.source_table) == key(&spec.destination_table) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "transfer_within_table",
                path.clone(),
                format!("transfer of '{}' has the same source and destination", spec.source_field),
                Some("use table_modifications to rename fields in place".to_string()),
            ));
        }
        if deleted.contains(&key(&spec.source_table))
            || deleted.contains(&key(&spec.destination_table))
        {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "transfer_on_deleted_table",
                path.clone(),
                format!("transfer of '{}' touches a deleted table", spec.source_field),
                None,
            ));
        }
        if let Some(domain) = &spec.destination.domain {
            if removed_domains.contains(&domain.to_ascii_lowercase()) {
                report.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "transfer_uses_deleted_domain",
                    format!("{path}/destination/domain"),
                    format!("domain '{domain}' is deleted before the transfer runs"),
                    None,
                ));
            }
        }
    }

    for (index, group) in plan.contingent_groups.iter().enumerate() {
        if group.class_field.eq_ignore_ascii_case(&group.subclass_field) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "contingent_fields_identical",
                format!("/contingent_groups/{index}"),
                format!("group '{}' uses one field twice", group.group_name),
                None,
            ));
        }
        if removed_domains.contains(&group.domain.to_ascii_lowercase()) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "contingent_domain_deleted",
                format!("/contingent_groups/{index}/domain"),
                format!("domain '{}' is deleted before the group is rebuilt", group.domain),
                None,
            ));
        }
    }

    for (index, table) in plan.skip_tables.iter().enumerate() {
        if modified.contains(&key(table)) {
            report.push_warning(ValidationIssue::new(
                IssueSeverity::Warning,
                "skipped_table_modified",
                format!("/skip_tables/{index}"),
                format!("table '{table}' is modified but never un-versioned"),
                None,
            ));
        }
    }

    report
}

fn key(table: &str) -> String {
    unqualified(table).to_ascii_lowercase()
}
