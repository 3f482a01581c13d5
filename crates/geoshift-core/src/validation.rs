use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::{TableSnapshot, WorkspaceSnapshot};
use crate::SNAPSHOT_VERSION;

/// Validate internal consistency of a workspace snapshot.
///
/// This checks:
/// - the snapshot contract version
/// - duplicate domains/tables/fields (names compare case-insensitively)
/// - every row has one value per field
/// - field domains and field-group fields exist
pub fn validate_snapshot(snapshot: &WorkspaceSnapshot) -> Result<()> {
    if snapshot.snapshot_version != SNAPSHOT_VERSION {
        return Err(Error::UnsupportedSnapshotVersion {
            found: snapshot.snapshot_version.clone(),
            expected: SNAPSHOT_VERSION.to_string(),
        });
    }

    let mut domains = BTreeSet::new();
    for domain in &snapshot.domains {
        if !domains.insert(domain.name.to_lowercase()) {
            return Err(Error::InvalidSnapshot(format!(
                "duplicate domain name: {}",
                domain.name
            )));
        }
    }

    let mut tables = BTreeSet::new();
    let nested = snapshot
        .datasets
        .iter()
        .flat_map(|dataset| dataset.feature_classes.iter());

    for table in snapshot.tables.iter().chain(nested) {
        if !tables.insert(table.name.to_lowercase()) {
            return Err(Error::InvalidSnapshot(format!(
                "duplicate table name: {}",
                table.name
            )));
        }
        validate_table(table, &domains)?;
    }

    Ok(())
}

fn validate_table(table: &TableSnapshot, domains: &BTreeSet<String>) -> Result<()> {
    let mut fields = BTreeSet::new();
    for field in &table.fields {
        if !fields.insert(field.name.to_lowercase()) {
            return Err(Error::InvalidSnapshot(format!(
                "duplicate field name: {}.{}",
                table.name, field.name
            )));
        }

        if let Some(domain) = &field.definition.domain {
            if !domains.contains(&domain.to_lowercase()) {
                return Err(Error::InvalidSnapshot(format!(
                    "domain not found for field {}.{}: {}",
                    table.name, field.name, domain
                )));
            }
        }
    }

    for (index, row) in table.rows.iter().enumerate() {
        if row.len() != table.fields.len() {
            return Err(Error::InvalidSnapshot(format!(
                "row {index} of {} has {} values for {} fields",
                table.name,
                row.len(),
                table.fields.len()
            )));
        }
    }

    for group in &table.field_groups {
        for field in &group.fields {
            if !fields.contains(&field.to_lowercase()) {
                return Err(Error::InvalidSnapshot(format!(
                    "field group {} references missing field {}.{}",
                    group.name, table.name, field
                )));
            }
        }
    }

    Ok(())
}
