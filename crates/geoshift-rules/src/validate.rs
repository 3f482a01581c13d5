use std::collections::HashSet;

use geoshift_core::{IssueSeverity, RuleKind, ValidationIssue, ValidationReport, unqualified};
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::CATALOG_VERSION;
use crate::errors::RuleError;
use crate::model::{RuleCatalog, RuleEntry};

/// Validate a catalog JSON document against the catalog JSON Schema.
pub fn validate_catalog_json(
    catalog_json: &Value,
    catalog_schema: &Value,
) -> Result<ValidationReport, RuleError> {
    let compiled =
        JSONSchema::compile(catalog_schema).map_err(|err| RuleError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(catalog_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Semantic checks that the JSON Schema cannot express.
pub fn validate_catalog(catalog: &RuleCatalog) -> ValidationReport {
    let mut report = ValidationReport::default();

    if catalog.catalog_version != CATALOG_VERSION {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "unsupported_catalog_version",
            "/catalog_version",
            format!("catalog version '{}' is not supported", catalog.catalog_version),
            Some(format!("use catalog_version = \"{CATALOG_VERSION}\"")),
        ));
    }

    let mut tables = HashSet::new();
    for (table_index, table) in catalog.tables.iter().enumerate() {
        let table_path = format!("/tables/{table_index}");
        if !tables.insert(unqualified(&table.table).to_ascii_lowercase()) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "duplicate_table",
                format!("{table_path}/table"),
                format!("table '{}' is declared more than once", table.table),
                Some("merge the rule lists into one entry".to_string()),
            ));
        }

        let mut names = HashSet::new();
        for (rule_index, rule) in table.rules.iter().enumerate() {
            let rule_path = format!("{table_path}/rules/{rule_index}");
            if !names.insert(rule.name.to_ascii_lowercase()) {
                report.push_error(ValidationIssue::new(
                    IssueSeverity::Error,
                    "duplicate_rule",
                    format!("{rule_path}/name"),
                    format!("rule '{}' is declared more than once on {}", rule.name, table.table),
                    None,
                ));
            }
            validate_rule(rule, &rule_path, &mut report);
        }
    }

    report
}

fn validate_rule(rule: &RuleEntry, path: &str, report: &mut ValidationReport) {
    if rule.name.trim().is_empty() {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "empty_rule_name",
            format!("{path}/name"),
            "rule name must not be empty",
            None,
        ));
    }
    if rule.field.trim().is_empty() {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "empty_rule_field",
            format!("{path}/field"),
            format!("rule '{}' has no target field", rule.name),
            None,
        ));
    }

    match (&rule.expression, &rule.expression_file) {
        (Some(_), Some(_)) => report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "ambiguous_expression",
            path.to_string(),
            format!("rule '{}' sets both expression and expression_file", rule.name),
            Some("keep only one expression source".to_string()),
        )),
        (None, None) => report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "missing_expression",
            path.to_string(),
            format!("rule '{}' has no expression", rule.name),
            Some("set expression or expression_file".to_string()),
        )),
        _ => {}
    }

    if rule.triggers.as_ref().is_some_and(|triggers| triggers.is_empty()) {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "empty_triggers",
            format!("{path}/triggers"),
            format!("rule '{}' has no triggering events", rule.name),
            Some("omit triggers to default to insert".to_string()),
        ));
    }

    if rule.kind == RuleKind::Constraint && rule.error.is_none() {
        report.push_warning(ValidationIssue::new(
            IssueSeverity::Warning,
            "constraint_without_error",
            path.to_string(),
            format!("constraint '{}' has no error number or message", rule.name),
            None,
        ));
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
