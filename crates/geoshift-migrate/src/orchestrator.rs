//! Fixed-sequence schema migration.
//!
//! Steps run strictly in [`Step::ALL`] order. A failing item is recorded and
//! its siblings still run; a failing step aborts the run before re-versioning,
//! leaving tables un-versioned so the next run can repair them.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use geoshift_backend::{Backend, BackendError, BackendResult};
use geoshift_core::{CodedValue, ErrorOutcome, unqualified};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::contingent::rebuild_contingent_values;
use crate::discovery::{discover_tables, is_skipped};
use crate::errors::{MigrationError, Result};
use crate::model::{DomainChangeSpec, MigrationPlan, SchemaChangeSpec};
use crate::report::{ItemFailure, MigrationReport, StepReport, StepStatus};
use crate::transfer::transfer;

/// Named orchestrator steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Maintenance,
    TableRemoval,
    Unversion,
    FieldModifications,
    DomainRemoval,
    FieldMigration,
    ContingentValues,
    DomainAdditions,
    Reversion,
}

impl Step {
    pub const ALL: [Step; 9] = [
        Step::Maintenance,
        Step::TableRemoval,
        Step::Unversion,
        Step::FieldModifications,
        Step::DomainRemoval,
        Step::FieldMigration,
        Step::ContingentValues,
        Step::DomainAdditions,
        Step::Reversion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Maintenance => "maintenance",
            Step::TableRemoval => "table_removal",
            Step::Unversion => "unversion",
            Step::FieldModifications => "field_modifications",
            Step::DomainRemoval => "domain_removal",
            Step::FieldMigration => "field_migration",
            Step::ContingentValues => "contingent_values",
            Step::DomainAdditions => "domain_additions",
            Step::Reversion => "reversion",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = value.trim().replace('-', "_").to_ascii_lowercase();
        Step::ALL
            .into_iter()
            .find(|step| step.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Step::ALL.iter().map(|step| step.as_str()).collect();
                format!("unknown step '{value}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Runs a [`MigrationPlan`] against a backend.
#[derive(Debug, Clone)]
pub struct Migrator<'a> {
    plan: &'a MigrationPlan,
    stop_after: Option<Step>,
}

impl<'a> Migrator<'a> {
    pub fn new(plan: &'a MigrationPlan) -> Self {
        Self {
            plan,
            stop_after: None,
        }
    }

    /// Run the sequence only up to and including `step`.
    pub fn stop_after(mut self, step: Option<Step>) -> Self {
        self.stop_after = step;
        self
    }

    pub fn run<B: Backend + ?Sized>(&self, backend: &mut B) -> Result<MigrationReport> {
        info!(workspace = %backend.workspace(), "acting on workspace");
        self.check_locks(backend)?;

        let mut report = MigrationReport::default();
        for step in Step::ALL {
            info!(step = %step, "step started");
            let mut step_report = StepReport::new(step);
            let outcome = match step {
                Step::Maintenance => self.maintenance(backend, &mut step_report),
                Step::TableRemoval => self.remove_tables(backend, &mut step_report),
                Step::Unversion => self.unversion(backend, &mut report.tables),
                Step::FieldModifications => self.modify_tables(backend, &mut step_report),
                Step::DomainRemoval => self.remove_domains(backend, &mut step_report),
                Step::FieldMigration => self.migrate_fields(backend, &mut step_report),
                Step::ContingentValues => self.rebuild_contingencies(backend),
                Step::DomainAdditions => self.add_coded_values(backend, &mut step_report),
                Step::Reversion => self.reversion(backend, &report.tables, &mut step_report),
            };

            if let Err(err) = outcome {
                error!(step = %step, error = %err, "step failed, aborting run");
                let code = match &err {
                    MigrationError::Backend { source, .. } => Some(source.code.clone()),
                    _ => None,
                };
                step_report.status = StepStatus::Failed;
                step_report
                    .failures
                    .push(ItemFailure::new(step.as_str(), code, err.to_string()));
                report.steps.push(step_report);
                return Err(MigrationError::Aborted {
                    step,
                    report: Box::new(report),
                });
            }

            info!(
                step = %step,
                status = %step_report.status,
                failures = step_report.failures.len(),
                "step finished"
            );
            report.steps.push(step_report);

            if self.stop_after == Some(step) {
                warn!(step = %step, "stopping early on request");
                report.stopped_after = Some(step);
                break;
            }
        }

        Ok(report)
    }

    /// Every table the plan alters must be lockable before anything changes.
    fn check_locks<B: Backend + ?Sized>(&self, backend: &mut B) -> Result<()> {
        let plan = self.plan;
        let candidates = plan
            .table_modifications
            .iter()
            .map(|change| change.table.as_str())
            .chain(plan.field_transfers.iter().flat_map(|spec| {
                [spec.source_table.as_str(), spec.destination_table.as_str()]
            }))
            .chain(plan.contingent_groups.iter().map(|group| group.table.as_str()));

        let mut seen = HashSet::new();
        for table in candidates {
            if !seen.insert(unqualified(table).to_ascii_lowercase()) {
                continue;
            }
            if !backend.test_schema_lock(table) {
                error!(table = %table, "unable to acquire the schema lock");
                return Err(MigrationError::LockUnavailable(table.to_string()));
            }
        }
        Ok(())
    }

    fn maintenance<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        report: &mut StepReport,
    ) -> Result<()> {
        info!("compressing database");
        if let Err(err) = backend.compress() {
            skip_if_denied("compress", err, report);
        }
        info!("analyzing database");
        if let Err(err) = backend.analyze() {
            skip_if_denied("analyze", err, report);
        }
        Ok(())
    }

    fn remove_tables<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        report: &mut StepReport,
    ) -> Result<()> {
        info!(tables = self.plan.tables_to_delete.len(), "removing tables");
        for table in &self.plan.tables_to_delete {
            if let Err(err) = backend.delete_table(table) {
                error!(table = %table, error = %err, "table removal failed");
                report.fail_item(item_failure(table, &err));
            }
        }
        Ok(())
    }

    fn unversion<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        tables: &mut Vec<String>,
    ) -> Result<()> {
        let discovered = discover_tables(backend)
            .map_err(|source| MigrationError::backend("discovering tables", source))?;
        tables.clear();
        tables.extend(
            discovered
                .into_iter()
                .filter(|table| !is_skipped(table, &self.plan.skip_tables)),
        );

        info!(tables = tables.len(), "unversioning tables");
        for table in tables.iter() {
            let state = backend.versioning_state(table).map_err(|source| {
                MigrationError::backend(format!("reading versioning of {table}"), source)
            })?;
            if !state.versioned && state.fields.is_none() {
                info!(table = %table, "already unversioned");
                continue;
            }

            info!(table = %table, "unversioning");
            if state.versioned {
                tolerate(
                    backend.unregister_as_versioned(table),
                    &[ErrorOutcome::AlreadyRemoved],
                )
                .map_err(|source| {
                    MigrationError::backend(format!("unversioning {table}"), source)
                })?;
            }
            if state.fields.is_some() {
                backend.disable_editor_tracking(table).map_err(|source| {
                    MigrationError::backend(format!("disabling editor tracking on {table}"), source)
                })?;
            }
        }
        Ok(())
    }

    fn modify_tables<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        report: &mut StepReport,
    ) -> Result<()> {
        info!("applying table modifications");
        for change in &self.plan.table_modifications {
            if let Err(err) = modify_table(backend, change) {
                error!(table = %change.table, error = %err, "table modification failed");
                report.fail_item(item_failure(&change.table, &err));
            }
        }
        Ok(())
    }

    fn remove_domains<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        report: &mut StepReport,
    ) -> Result<()> {
        for change in &self.plan.domain_changes {
            let DomainChangeSpec::Delete { domain } = change else {
                continue;
            };
            info!(domain = %domain, "removing domain");
            match backend.delete_domain(domain) {
                Ok(()) => {}
                Err(err) if err.outcome() == ErrorOutcome::AlreadyRemoved => {
                    info!(domain = %domain, "domain already removed");
                }
                Err(err) => {
                    error!(domain = %domain, error = %err, "domain removal failed");
                    report.fail_item(item_failure(domain, &err));
                }
            }
        }
        Ok(())
    }

    fn migrate_fields<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        report: &mut StepReport,
    ) -> Result<()> {
        for spec in &self.plan.field_transfers {
            let result = match transfer(backend, spec) {
                Ok(result) => result,
                Err(MigrationError::InvalidState(message)) => {
                    error!(
                        source = %spec.source_table,
                        field = %spec.source_field,
                        error = %message,
                        "field transfer skipped"
                    );
                    report.fail_item(ItemFailure::new(
                        format!("{}.{}", spec.source_table, spec.source_field),
                        None,
                        message,
                    ));
                    continue;
                }
                Err(err) => return Err(err),
            };
            for failure in &result.failures {
                report.fail_item(failure.clone());
            }
            report.transfers.push(result);
        }
        Ok(())
    }

    fn rebuild_contingencies<B: Backend + ?Sized>(&self, backend: &mut B) -> Result<()> {
        for group in &self.plan.contingent_groups {
            rebuild_contingent_values(backend, group)?;
        }
        Ok(())
    }

    fn add_coded_values<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        report: &mut StepReport,
    ) -> Result<()> {
        for change in &self.plan.domain_changes {
            let DomainChangeSpec::AddCodedValue {
                domain,
                code,
                label,
            } = change
            else {
                continue;
            };
            info!(domain = %domain, code = %code, "adding coded value");
            let value = CodedValue {
                code: code.clone(),
                label: label.clone(),
            };
            match backend.add_coded_value(domain, &value) {
                Ok(()) => {}
                Err(err) if err.outcome() == ErrorOutcome::AlreadyApplied => {
                    info!(domain = %domain, code = %code, "coded value already present");
                }
                Err(err) => {
                    error!(domain = %domain, error = %err, "coded value addition failed");
                    report.fail_item(item_failure(domain, &err));
                }
            }
        }
        Ok(())
    }

    fn reversion<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        tables: &[String],
        report: &mut StepReport,
    ) -> Result<()> {
        info!(tables = tables.len(), "updating editor tracking and versioning");
        for table in tables {
            info!(table = %table, "versioning");
            let outcome = backend.versioning_state(table).and_then(|state| {
                if state.fields.is_none() {
                    backend.enable_editor_tracking(table, &self.plan.editor_tracking)?;
                }
                if state.versioned {
                    return Ok(());
                }
                tolerate(
                    backend.register_as_versioned(table),
                    &[ErrorOutcome::AlreadyApplied],
                )
            });
            if let Err(err) = outcome {
                error!(table = %table, error = %err, "re-versioning failed");
                report.fail_item(item_failure(table, &err));
            }
        }
        Ok(())
    }
}

/// Deletes in one batch, then adds one field at a time; stops at the first
/// unclassified failure.
fn modify_table<B: Backend + ?Sized>(
    backend: &mut B,
    change: &SchemaChangeSpec,
) -> BackendResult<()> {
    info!(table = %change.table, "modifying table");
    if !change.delete_fields.is_empty() {
        tolerate(
            backend.delete_fields(&change.table, &change.delete_fields),
            &[ErrorOutcome::AlreadyApplied, ErrorOutcome::AlreadyRemoved],
        )?;
    }
    for field in &change.add_fields {
        if let Err(err) = backend.add_field(&change.table, field) {
            if !err.outcome().is_idempotent_skip() {
                return Err(err);
            }
            info!(table = %change.table, field = %field.name, "field likely upgraded already");
        }
        if let Some(default) = &field.definition.default {
            backend.assign_default(&change.table, &field.name, Some(default))?;
        }
    }
    Ok(())
}

/// Treat the listed outcomes as success.
fn tolerate(result: BackendResult<()>, outcomes: &[ErrorOutcome]) -> BackendResult<()> {
    match result {
        Err(err) if outcomes.contains(&err.outcome()) => {
            info!(code = %err.code, outcome = %err.outcome(), "already in the desired state");
            Ok(())
        }
        other => other,
    }
}

fn skip_if_denied(operation: &str, err: BackendError, report: &mut StepReport) {
    if err.outcome() == ErrorOutcome::PermissionDenied {
        warn!(operation, "skipping, insufficient permissions");
    } else {
        error!(operation, error = %err, "maintenance failed");
        report.fail_item(item_failure(operation, &err));
    }
}

fn item_failure(item: &str, err: &BackendError) -> ItemFailure {
    ItemFailure::new(item, Some(err.code.clone()), err.message.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_parse_from_cli_spelling() {
        assert_eq!("unversion".parse::<Step>(), Ok(Step::Unversion));
        assert_eq!("field-migration".parse::<Step>(), Ok(Step::FieldMigration));
        assert_eq!("Contingent_Values".parse::<Step>(), Ok(Step::ContingentValues));
        assert!("compress".parse::<Step>().is_err());
    }

    #[test]
    fn steps_are_ordered_with_reversion_last() {
        let mut sorted = Step::ALL;
        sorted.sort();
        assert_eq!(sorted, Step::ALL);
        assert_eq!(Step::ALL.last(), Some(&Step::Reversion));
    }
}
