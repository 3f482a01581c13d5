//! Create-or-update and delete passes for one table's attribute rules.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use geoshift_backend::{Backend, BackendError};
use geoshift_core::{AttributeRuleDefinition, ErrorOutcome, RuleDescriptor};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::RuleError;
use crate::triggers::triggering_fields;

/// Terminal outcome for one rule.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Existing rule altered in place.
    Updated,
    Created,
    /// Creation reported the rule already exists.
    SkippedExisting,
    Deleted,
    /// Deletion reported the rule was already gone.
    SkippedMissing,
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RuleAction::Updated => "updated",
            RuleAction::Created => "created",
            RuleAction::SkippedExisting => "skipped (exists)",
            RuleAction::Deleted => "deleted",
            RuleAction::SkippedMissing => "skipped (missing)",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RuleOutcome {
    pub rule: String,
    pub action: RuleAction,
}

/// Actions taken for one table, in rule order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RuleGroupReport {
    pub table: String,
    pub actions: Vec<RuleOutcome>,
}

impl RuleGroupReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            actions: Vec::new(),
        }
    }

    fn record(&mut self, rule: &str, action: RuleAction) {
        self.actions.push(RuleOutcome {
            rule: rule.to_string(),
            action,
        });
    }

    pub fn count(&self, action: RuleAction) -> usize {
        self.actions
            .iter()
            .filter(|outcome| outcome.action == action)
            .count()
    }
}

/// Transient execution unit: one table and its ordered rules.
///
/// Backend calls address the table by `table_path` (workspace joined with the
/// table name); reports use `table`.
#[derive(Debug, Clone)]
pub struct RuleGroup<'a> {
    pub table: String,
    pub table_path: PathBuf,
    pub rules: &'a [RuleDescriptor],
}

impl<'a> RuleGroup<'a> {
    pub fn new(workspace: &str, table: impl Into<String>, rules: &'a [RuleDescriptor]) -> Self {
        let table = table.into();
        let table_path = Path::new(workspace).join(&table);
        Self {
            table,
            table_path,
            rules,
        }
    }

    /// Bring every rule in line with its descriptor.
    ///
    /// Triggering fields are derived from the table's current columns once per
    /// pass. A rule failure aborts the rest of the group.
    pub fn reconcile<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<RuleGroupReport, RuleError> {
        info!(table = %self.table, rules = self.rules.len(), "reconciling attribute rules");
        let fields = backend
            .list_fields(&self.target())
            .map_err(|source| RuleError::Fields {
                table: self.table.clone(),
                source,
            })?;
        let triggering = triggering_fields(&fields);
        debug!(table = %self.table, fields = ?triggering, "triggering fields");

        let mut report = RuleGroupReport::new(&self.table);
        for rule in self.rules {
            let definition = rule.to_definition(&triggering);
            let action = self.reconcile_rule(backend, &definition)?;
            info!(table = %self.table, rule = %rule.name, action = %action, "rule reconciled");
            report.record(&rule.name, action);
        }
        Ok(report)
    }

    /// Remove every rule in the group; missing rules count as removed.
    pub fn delete<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<RuleGroupReport, RuleError> {
        info!(table = %self.table, rules = self.rules.len(), "deleting attribute rules");
        let mut report = RuleGroupReport::new(&self.table);
        for rule in self.rules {
            let action = match backend.delete_attribute_rule(
                &self.target(),
                &rule.name,
                rule.kind.backend_type(),
            ) {
                Ok(()) => RuleAction::Deleted,
                Err(err) if err.outcome() == ErrorOutcome::AlreadyRemoved => {
                    debug!(table = %self.table, rule = %rule.name, code = %err.code, "rule already deleted");
                    RuleAction::SkippedMissing
                }
                Err(source) => return Err(self.failure(&rule.name, source)),
            };
            info!(table = %self.table, rule = %rule.name, action = %action, "rule deleted");
            report.record(&rule.name, action);
        }
        Ok(report)
    }

    fn reconcile_rule<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        definition: &AttributeRuleDefinition,
    ) -> Result<RuleAction, RuleError> {
        let target = self.target();
        match backend.attribute_rule_exists(&target, &definition.name) {
            Some(true) => {
                return backend
                    .alter_attribute_rule(&target, definition)
                    .map(|()| RuleAction::Updated)
                    .map_err(|source| self.failure(&definition.name, source));
            }
            Some(false) => return self.create_rule(backend, definition),
            None => {}
        }

        match backend.alter_attribute_rule(&target, definition) {
            Ok(()) => Ok(RuleAction::Updated),
            Err(err) => {
                debug!(
                    table = %self.table,
                    rule = %definition.name,
                    code = %err.code,
                    outcome = %err.outcome(),
                    "alter failed, creating rule"
                );
                self.create_rule(backend, definition)
            }
        }
    }

    fn create_rule<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        definition: &AttributeRuleDefinition,
    ) -> Result<RuleAction, RuleError> {
        match backend.add_attribute_rule(&self.target(), definition) {
            Ok(()) => Ok(RuleAction::Created),
            Err(err) if err.outcome() == ErrorOutcome::AlreadyApplied => {
                warn!(table = %self.table, rule = %definition.name, "rule already exists, skipping");
                Ok(RuleAction::SkippedExisting)
            }
            Err(source) => Err(self.failure(&definition.name, source)),
        }
    }

    fn target(&self) -> Cow<'_, str> {
        self.table_path.to_string_lossy()
    }

    fn failure(&self, rule: &str, source: BackendError) -> RuleError {
        RuleError::Backend {
            table: self.table.clone(),
            rule: rule.to_string(),
            source,
        }
    }
}
