//! In-memory geodatabase backed by a JSON workspace snapshot.
//!
//! Used for local rehearsal runs against a copy of a workspace and as the
//! backend for engine tests. Error codes mirror the ones a real service
//! reports, so the classifier sees the same inputs.

use std::fs;
use std::path::Path;

use tracing::debug;

use geoshift_core::{
    AttributeRuleDefinition, BackendRuleType, CodedValue, ContingentEntry, Domain,
    EditorTrackingFields, Field, FieldDefinition, FieldGroup, FieldType, FieldValue, Row,
    TableKind, TableSnapshot, VersioningState, WorkspaceSnapshot, codes as known, unqualified,
    validate_snapshot,
};

use crate::adapter::{Backend, UpdateCursor};
use crate::error::{BackendError, BackendResult, SnapshotError};

mod cursor;
mod faults;

use cursor::MemoryUpdateCursor;
pub use faults::Faults;

/// Codes for failures that have no idempotent meaning.
pub mod codes {
    pub const TABLE_NOT_FOUND: &str = "ERROR 000732";
    pub const INVALID_PREDICATE: &str = "ERROR 000358";
    pub const SCHEMA_CHANGE_ON_VERSIONED: &str = "ERROR 001260";
    pub const DOMAIN_IN_USE: &str = "ERROR 000801";
    pub const UNKNOWN_DOMAIN: &str = "ERROR 000344";
    pub const FIELD_GROUP_EXISTS: &str = "ERROR 002583";
    pub const ROW_WRITE_FAILED: &str = "ERROR 999999";
    pub const CURSOR_NOT_POSITIONED: &str = "ERROR 999998";
}

/// Backend operating on an in-memory [`WorkspaceSnapshot`].
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    snapshot: WorkspaceSnapshot,
    faults: Faults,
    rule_probe: bool,
    row_writes: u64,
}

impl MemoryBackend {
    /// Wrap a snapshot after validating it.
    pub fn new(snapshot: WorkspaceSnapshot) -> Result<Self, SnapshotError> {
        validate_snapshot(&snapshot)?;
        Ok(Self {
            snapshot,
            faults: Faults::default(),
            rule_probe: false,
            row_writes: 0,
        })
    }

    /// Load a snapshot from a JSON file.
    pub fn open(path: &Path) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path)?;
        let snapshot: WorkspaceSnapshot = serde_json::from_str(&content)?;
        Self::new(snapshot)
    }

    /// Write the current state back as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let encoded = serde_json::to_vec_pretty(&self.snapshot)?;
        fs::write(path, encoded)?;
        Ok(())
    }

    /// Answer [`Backend::attribute_rule_exists`] instead of returning `None`.
    pub fn with_rule_probe(mut self, enabled: bool) -> Self {
        self.rule_probe = enabled;
        self
    }

    pub fn snapshot(&self) -> &WorkspaceSnapshot {
        &self.snapshot
    }

    pub fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    /// Number of rows written through update cursors.
    pub fn row_writes(&self) -> u64 {
        self.row_writes
    }

    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        let wanted = unqualified(name);
        self.snapshot
            .tables
            .iter()
            .chain(
                self.snapshot
                    .datasets
                    .iter()
                    .flat_map(|dataset| dataset.feature_classes.iter()),
            )
            .find(|table| unqualified(&table.name).eq_ignore_ascii_case(wanted))
    }

    pub fn domain(&self, name: &str) -> Option<&Domain> {
        self.snapshot
            .domains
            .iter()
            .find(|domain| domain.name.eq_ignore_ascii_case(name))
    }

    fn table_mut(&mut self, name: &str) -> BackendResult<&mut TableSnapshot> {
        find_table_mut(&mut self.snapshot, name)
    }

    fn domain_mut(&mut self, name: &str) -> BackendResult<&mut Domain> {
        self.snapshot
            .domains
            .iter_mut()
            .find(|domain| domain.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                BackendError::new(known::DOMAIN_NOT_FOUND, format!("domain {name} not found"))
            })
    }

    fn domain_in_use(&self, name: &str) -> Option<String> {
        self.snapshot
            .tables
            .iter()
            .chain(
                self.snapshot
                    .datasets
                    .iter()
                    .flat_map(|dataset| dataset.feature_classes.iter()),
            )
            .find_map(|table| {
                table
                    .fields
                    .iter()
                    .find(|field| {
                        field
                            .definition
                            .domain
                            .as_deref()
                            .is_some_and(|domain| domain.eq_ignore_ascii_case(name))
                    })
                    .map(|field| format!("{}.{}", table.name, field.name))
            })
    }
}

fn find_table_mut<'a>(
    snapshot: &'a mut WorkspaceSnapshot,
    name: &str,
) -> BackendResult<&'a mut TableSnapshot> {
    let wanted = unqualified(name);
    let WorkspaceSnapshot {
        tables, datasets, ..
    } = snapshot;
    tables
        .iter_mut()
        .chain(
            datasets
                .iter_mut()
                .flat_map(|dataset| dataset.feature_classes.iter_mut()),
        )
        .find(|table| unqualified(&table.name).eq_ignore_ascii_case(wanted))
        .ok_or_else(|| table_not_found(name))
}

fn table_not_found(name: &str) -> BackendError {
    BackendError::new(
        codes::TABLE_NOT_FOUND,
        format!("dataset {name} does not exist or is not supported"),
    )
}

fn field_not_found(table: &str, field: &str) -> BackendError {
    BackendError::new(
        known::FIELD_NOT_FOUND,
        format!("field {field} does not exist within table {table}"),
    )
}

fn column_indexes(table: &TableSnapshot, fields: &[String]) -> BackendResult<Vec<usize>> {
    fields
        .iter()
        .map(|field| {
            table
                .field_index(field)
                .ok_or_else(|| field_not_found(&table.name, field))
        })
        .collect()
}

fn ensure_unversioned(table: &TableSnapshot) -> BackendResult<()> {
    if table.versioned {
        return Err(BackendError::new(
            codes::SCHEMA_CHANGE_ON_VERSIONED,
            format!("{} is registered as versioned", table.name),
        ));
    }
    Ok(())
}

fn tracking_field_type(fields: &EditorTrackingFields, name: &str) -> FieldType {
    if name == fields.creation_date || name == fields.last_edit_date {
        FieldType::Date
    } else {
        FieldType::Text
    }
}

impl Backend for MemoryBackend {
    fn workspace(&self) -> &str {
        &self.snapshot.workspace
    }

    fn compress(&mut self) -> BackendResult<()> {
        self.faults.check("compress", None)
    }

    fn analyze(&mut self) -> BackendResult<()> {
        self.faults.check("analyze", None)
    }

    fn test_schema_lock(&mut self, table: &str) -> bool {
        self.table(table).is_some() && !self.faults.lock_denied(table)
    }

    fn list_tables(&mut self) -> BackendResult<Vec<String>> {
        self.faults.check("list_tables", None)?;
        Ok(self
            .snapshot
            .tables
            .iter()
            .filter(|table| table.kind == TableKind::Table)
            .map(|table| table.name.clone())
            .collect())
    }

    fn list_datasets(&mut self) -> BackendResult<Vec<String>> {
        self.faults.check("list_datasets", None)?;
        Ok(self
            .snapshot
            .datasets
            .iter()
            .map(|dataset| dataset.name.clone())
            .collect())
    }

    fn list_feature_classes(&mut self, dataset: Option<&str>) -> BackendResult<Vec<String>> {
        self.faults.check("list_feature_classes", dataset)?;
        let tables = match dataset {
            None => &self.snapshot.tables,
            Some(name) => {
                &self
                    .snapshot
                    .datasets
                    .iter()
                    .find(|dataset| dataset.name.eq_ignore_ascii_case(name))
                    .ok_or_else(|| table_not_found(name))?
                    .feature_classes
            }
        };
        Ok(tables
            .iter()
            .filter(|table| table.kind == TableKind::FeatureClass)
            .map(|table| table.name.clone())
            .collect())
    }

    fn delete_table(&mut self, table: &str) -> BackendResult<()> {
        self.faults.check("delete_table", Some(table))?;
        let wanted = unqualified(table);
        let is_target =
            |candidate: &TableSnapshot| unqualified(&candidate.name).eq_ignore_ascii_case(wanted);
        self.snapshot.tables.retain(|candidate| !is_target(candidate));
        for dataset in &mut self.snapshot.datasets {
            dataset
                .feature_classes
                .retain(|candidate| !is_target(candidate));
        }
        Ok(())
    }

    fn truncate_table(&mut self, table: &str) -> BackendResult<()> {
        self.faults.check("truncate_table", Some(table))?;
        self.table_mut(table)?.rows.clear();
        Ok(())
    }

    fn append(&mut self, source: &str, target: &str) -> BackendResult<u64> {
        self.faults.check("append", Some(target))?;
        let source_rows = self
            .snapshot
            .sources
            .iter()
            .find(|candidate| candidate.locator == source)
            .cloned()
            .ok_or_else(|| table_not_found(source))?;

        let table = self.table_mut(target)?;
        let mapping: Vec<Option<usize>> = table
            .fields
            .iter()
            .map(|field| {
                source_rows
                    .fields
                    .iter()
                    .position(|name| field.is_named(name))
            })
            .collect();

        for source_row in &source_rows.rows {
            let row = mapping
                .iter()
                .map(|index| {
                    index
                        .and_then(|index| source_row.get(index).cloned())
                        .unwrap_or(FieldValue::Null)
                })
                .collect();
            table.rows.push(row);
        }

        Ok(source_rows.rows.len() as u64)
    }

    fn versioning_state(&mut self, table: &str) -> BackendResult<VersioningState> {
        self.faults.check("versioning_state", Some(table))?;
        let table = self.table_mut(table)?;
        Ok(VersioningState {
            versioned: table.versioned,
            fields: table.editor_tracking.clone(),
        })
    }

    fn register_as_versioned(&mut self, table: &str) -> BackendResult<()> {
        self.faults.check("register_as_versioned", Some(table))?;
        let table = self.table_mut(table)?;
        if table.versioned {
            return Err(BackendError::new(
                known::ALREADY_VERSIONED,
                format!("{} is already registered as versioned", table.name),
            ));
        }
        table.versioned = true;
        Ok(())
    }

    fn unregister_as_versioned(&mut self, table: &str) -> BackendResult<()> {
        self.faults.check("unregister_as_versioned", Some(table))?;
        let table = self.table_mut(table)?;
        if !table.versioned {
            return Err(BackendError::new(
                known::NOT_VERSIONED,
                format!("{} is not registered as versioned", table.name),
            ));
        }
        table.versioned = false;
        Ok(())
    }

    fn enable_editor_tracking(
        &mut self,
        table: &str,
        fields: &EditorTrackingFields,
    ) -> BackendResult<()> {
        self.faults.check("enable_editor_tracking", Some(table))?;
        let table = self.table_mut(table)?;
        for name in fields.names() {
            if table.field_index(name).is_none() {
                let definition = FieldDefinition::of_type(tracking_field_type(fields, name));
                table.fields.push(Field::new(name, definition));
                for row in &mut table.rows {
                    row.push(FieldValue::Null);
                }
            }
        }
        table.editor_tracking = Some(fields.clone());
        Ok(())
    }

    fn disable_editor_tracking(&mut self, table: &str) -> BackendResult<()> {
        self.faults.check("disable_editor_tracking", Some(table))?;
        self.table_mut(table)?.editor_tracking = None;
        Ok(())
    }

    fn list_fields(&mut self, table: &str) -> BackendResult<Vec<Field>> {
        self.faults.check("list_fields", Some(table))?;
        Ok(self.table_mut(table)?.fields.clone())
    }

    fn add_field(&mut self, table: &str, field: &Field) -> BackendResult<()> {
        self.faults.check("add_field", Some(table))?;
        if let Some(domain) = &field.definition.domain {
            if self.domain(domain).is_none() {
                return Err(BackendError::new(
                    codes::UNKNOWN_DOMAIN,
                    format!("domain {domain} is not defined in the workspace"),
                ));
            }
        }

        let table = self.table_mut(table)?;
        ensure_unversioned(table)?;
        if table.field_index(&field.name).is_some() {
            return Err(BackendError::new(
                known::FIELD_ALREADY_EXISTS,
                format!("field {} already exists in {}", field.name, table.name),
            ));
        }

        let mut definition = field.definition.clone();
        definition.default = None;
        table.fields.push(Field::new(field.name.clone(), definition));
        for row in &mut table.rows {
            row.push(FieldValue::Null);
        }
        debug!(table = %table.name, field = %field.name, "field added");
        Ok(())
    }

    fn assign_default(
        &mut self,
        table: &str,
        field: &str,
        default: Option<&FieldValue>,
    ) -> BackendResult<()> {
        self.faults.check("assign_default", Some(table))?;
        let table = self.table_mut(table)?;
        let index = table
            .field_index(field)
            .ok_or_else(|| field_not_found(&table.name, field))?;
        table.fields[index].definition.default = default.cloned();
        Ok(())
    }

    fn delete_fields(&mut self, table: &str, fields: &[String]) -> BackendResult<()> {
        self.faults.check("delete_fields", Some(table))?;
        let table = self.table_mut(table)?;
        ensure_unversioned(table)?;

        let mut missing = Vec::new();
        for name in fields {
            match table.field_index(name) {
                Some(index) => {
                    table.fields.remove(index);
                    for row in &mut table.rows {
                        if index < row.len() {
                            row.remove(index);
                        }
                    }
                }
                None => missing.push(name.as_str()),
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(field_not_found(&table.name, &missing.join(";")))
        }
    }

    fn list_domains(&mut self) -> BackendResult<Vec<Domain>> {
        self.faults.check("list_domains", None)?;
        Ok(self.snapshot.domains.clone())
    }

    fn delete_domain(&mut self, domain: &str) -> BackendResult<()> {
        self.faults.check("delete_domain", Some(domain))?;
        self.domain_mut(domain)?;
        if let Some(field) = self.domain_in_use(domain) {
            return Err(BackendError::new(
                codes::DOMAIN_IN_USE,
                format!("domain {domain} is used by {field}"),
            ));
        }
        self.snapshot
            .domains
            .retain(|candidate| !candidate.name.eq_ignore_ascii_case(domain));
        Ok(())
    }

    fn add_coded_value(&mut self, domain: &str, value: &CodedValue) -> BackendResult<()> {
        self.faults.check("add_coded_value", Some(domain))?;
        let domain = self.domain_mut(domain)?;
        if domain.contains_code(&value.code) {
            return Err(BackendError::new(
                known::CODED_VALUE_EXISTS,
                format!("code {} already exists in {}", value.code, domain.name),
            ));
        }
        domain.coded_values.push(value.clone());
        Ok(())
    }

    fn create_field_group(
        &mut self,
        table: &str,
        name: &str,
        fields: &[String],
    ) -> BackendResult<()> {
        self.faults.check("create_field_group", Some(table))?;
        let table = self.table_mut(table)?;
        column_indexes(table, fields)?;
        if table
            .field_groups
            .iter()
            .any(|group| group.name.eq_ignore_ascii_case(name))
        {
            return Err(BackendError::new(
                codes::FIELD_GROUP_EXISTS,
                format!("field group {name} already exists on {}", table.name),
            ));
        }
        table.field_groups.push(FieldGroup {
            name: name.to_string(),
            fields: fields.to_vec(),
            contingent_values: Vec::new(),
        });
        Ok(())
    }

    fn delete_field_group(&mut self, table: &str, name: &str) -> BackendResult<()> {
        self.faults.check("delete_field_group", Some(table))?;
        let table = self.table_mut(table)?;
        let before = table.field_groups.len();
        table
            .field_groups
            .retain(|group| !group.name.eq_ignore_ascii_case(name));
        if table.field_groups.len() == before {
            return Err(BackendError::new(
                known::FIELD_GROUP_NOT_FOUND,
                format!("field group {name} does not exist on {}", table.name),
            ));
        }
        Ok(())
    }

    fn add_contingent_value(
        &mut self,
        table: &str,
        group: &str,
        values: &[ContingentEntry],
    ) -> BackendResult<()> {
        self.faults.check("add_contingent_value", Some(table))?;
        let table = self.table_mut(table)?;
        let table_name = table.name.clone();
        let field_group = table
            .field_groups
            .iter_mut()
            .find(|candidate| candidate.name.eq_ignore_ascii_case(group))
            .ok_or_else(|| {
                BackendError::new(
                    known::FIELD_GROUP_NOT_FOUND,
                    format!("field group {group} does not exist on {table_name}"),
                )
            })?;

        for entry in values {
            if !field_group
                .fields
                .iter()
                .any(|field| field.eq_ignore_ascii_case(&entry.field))
            {
                return Err(field_not_found(&table_name, &entry.field));
            }
        }
        field_group.contingent_values.push(values.to_vec());
        Ok(())
    }

    fn search(
        &mut self,
        table: &str,
        fields: &[String],
        predicate: Option<&str>,
    ) -> BackendResult<Vec<Row>> {
        self.faults.check("search", Some(table))?;
        if let Some(predicate) = predicate {
            if predicate.trim() != "1=1" {
                return Err(BackendError::new(
                    codes::INVALID_PREDICATE,
                    format!("unsupported where clause: {predicate}"),
                ));
            }
        }

        let table = self.table_mut(table)?;
        let columns = column_indexes(table, fields)?;
        Ok(table
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(*column).cloned().unwrap_or(FieldValue::Null))
                    .collect()
            })
            .collect())
    }

    fn update_cursor<'a>(
        &'a mut self,
        table: &str,
        fields: &[String],
    ) -> BackendResult<Box<dyn UpdateCursor + 'a>> {
        self.faults.check("update_cursor", Some(table))?;
        let failing = self.faults.failing_rows(table);
        let snapshot_table = find_table_mut(&mut self.snapshot, table)?;
        let columns = column_indexes(snapshot_table, fields)?;

        Ok(Box::new(MemoryUpdateCursor {
            table: snapshot_table,
            columns,
            failing,
            writes: &mut self.row_writes,
            next: 0,
            current: None,
        }))
    }

    fn attribute_rule_exists(&mut self, table: &str, name: &str) -> Option<bool> {
        if !self.rule_probe {
            return None;
        }
        let table = self.table(table)?;
        Some(
            table
                .attribute_rules
                .iter()
                .any(|rule| rule.name.eq_ignore_ascii_case(name)),
        )
    }

    fn add_attribute_rule(
        &mut self,
        table: &str,
        rule: &AttributeRuleDefinition,
    ) -> BackendResult<()> {
        self.faults.check("add_attribute_rule", Some(table))?;
        let table = self.table_mut(table)?;
        if table
            .attribute_rules
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(&rule.name))
        {
            return Err(BackendError::new(
                known::RULE_ALREADY_EXISTS,
                format!("rule {} already exists on {}", rule.name, table.name),
            ));
        }
        table.attribute_rules.push(rule.clone());
        Ok(())
    }

    fn alter_attribute_rule(
        &mut self,
        table: &str,
        rule: &AttributeRuleDefinition,
    ) -> BackendResult<()> {
        self.faults.check("alter_attribute_rule", Some(table))?;
        let table = self.table_mut(table)?;
        let table_name = table.name.clone();
        let existing = table
            .attribute_rules
            .iter_mut()
            .find(|existing| existing.name.eq_ignore_ascii_case(&rule.name))
            .ok_or_else(|| {
                BackendError::new(
                    known::RULE_NOT_FOUND,
                    format!("rule {} does not exist on {table_name}", rule.name),
                )
            })?;

        existing.expression = rule.expression.clone();
        existing.triggering_events = rule.triggering_events.clone();
        existing.triggering_fields = rule.triggering_fields.clone();
        existing.error_number = rule.error_number;
        existing.error_message = rule.error_message.clone();
        Ok(())
    }

    fn delete_attribute_rule(
        &mut self,
        table: &str,
        name: &str,
        rule_type: BackendRuleType,
    ) -> BackendResult<()> {
        self.faults.check("delete_attribute_rule", Some(table))?;
        let table = self.table_mut(table)?;
        let before = table.attribute_rules.len();
        table.attribute_rules.retain(|rule| {
            !(rule.name.eq_ignore_ascii_case(name) && rule.rule_type == rule_type)
        });
        if table.attribute_rules.len() == before {
            return Err(BackendError::new(
                known::RULE_NOT_FOUND,
                format!("rule {name} does not exist on {}", table.name),
            ));
        }
        Ok(())
    }
}
