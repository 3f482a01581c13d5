//! Cache-then-transfer migration of one column between correlated tables.

use std::collections::HashMap;

use geoshift_backend::{Backend, BackendError};
use geoshift_core::{ErrorOutcome, Field, FieldValue, ValueKey};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{MigrationError, Result};
use crate::model::FieldTransferSpec;
use crate::report::ItemFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Every matched row was written and the source field removed.
    Completed,
    /// A previous run already finished this transfer.
    AlreadyMigrated,
    /// Some writes failed; the source field was kept.
    Partial,
}

/// Outcome of one [`transfer`].
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub source_table: String,
    pub destination_table: String,
    pub field: String,
    pub status: TransferStatus,
    pub rows_cached: u64,
    pub rows_written: u64,
    /// Destination rows with no source record.
    pub rows_unmatched: u64,
    pub failures: Vec<ItemFailure>,
    pub source_removed: bool,
}

impl TransferResult {
    fn new(spec: &FieldTransferSpec, status: TransferStatus) -> Self {
        Self {
            source_table: spec.source_table.clone(),
            destination_table: spec.destination_table.clone(),
            field: spec.destination_field().to_string(),
            status,
            rows_cached: 0,
            rows_written: 0,
            rows_unmatched: 0,
            failures: Vec::new(),
            source_removed: false,
        }
    }
}

/// Move one column's values from the source to the destination table.
///
/// The source field is deleted only after every matched destination row was
/// written, so an interrupted or partially failed transfer can be re-run.
pub fn transfer<B: Backend + ?Sized>(
    backend: &mut B,
    spec: &FieldTransferSpec,
) -> Result<TransferResult> {
    let destination_field = spec.destination_field();
    info!(
        source = %spec.source_table,
        destination = %spec.destination_table,
        field = %spec.source_field,
        into = %destination_field,
        "moving field"
    );

    let source_present = has_field(backend, &spec.source_table, &spec.source_field)?;
    let destination_present = has_field(backend, &spec.destination_table, destination_field)?;

    if !source_present {
        if destination_present {
            info!(field = %spec.source_field, "migration likely completed");
            return Ok(TransferResult::new(spec, TransferStatus::AlreadyMigrated));
        }
        return Err(MigrationError::InvalidState(format!(
            "{} is missing from {} and {} is missing from {}",
            spec.source_field, spec.source_table, destination_field, spec.destination_table
        )));
    }

    if !destination_present {
        create_destination_field(backend, spec)?;
    }
    assign_destination_default(backend, spec)?;

    let cache = build_cache(backend, spec)?;
    let mut result = TransferResult::new(spec, TransferStatus::Completed);
    result.rows_cached = cache.len() as u64;
    apply_cache(backend, spec, &cache, &mut result)?;

    if !result.failures.is_empty() {
        warn!(
            field = %spec.source_field,
            failures = result.failures.len(),
            "row updates failed, keeping source field"
        );
        result.status = TransferStatus::Partial;
        return Ok(result);
    }

    info!(table = %spec.source_table, field = %spec.source_field, "removing source field");
    match backend.delete_fields(&spec.source_table, std::slice::from_ref(&spec.source_field)) {
        Ok(()) => result.source_removed = true,
        Err(err) if err.outcome() == ErrorOutcome::AlreadyRemoved => result.source_removed = true,
        Err(err) => {
            warn!(field = %spec.source_field, error = %err, "source field removal failed");
            result.failures.push(ItemFailure::new(
                format!("{}.{}", spec.source_table, spec.source_field),
                Some(err.code.clone()),
                err.message,
            ));
            result.status = TransferStatus::Partial;
        }
    }

    Ok(result)
}

fn has_field<B: Backend + ?Sized>(backend: &mut B, table: &str, field: &str) -> Result<bool> {
    let fields = backend
        .list_fields(table)
        .map_err(|source| MigrationError::backend(format!("listing fields of {table}"), source))?;
    Ok(fields.iter().any(|candidate| candidate.is_named(field)))
}

fn create_destination_field<B: Backend + ?Sized>(
    backend: &mut B,
    spec: &FieldTransferSpec,
) -> Result<()> {
    let name = spec.destination_field();
    let field = Field::new(name, spec.destination.clone());
    match backend.add_field(&spec.destination_table, &field) {
        Ok(()) => {}
        Err(err) if err.outcome() == ErrorOutcome::AlreadyApplied => {
            debug!(field = %name, "destination field already exists");
        }
        Err(source) => {
            return Err(MigrationError::backend(
                format!("creating {}.{name}", spec.destination_table),
                source,
            ));
        }
    }
    Ok(())
}

/// Assigned on every pass that still has a source field, not only when the
/// destination field is created.
fn assign_destination_default<B: Backend + ?Sized>(
    backend: &mut B,
    spec: &FieldTransferSpec,
) -> Result<()> {
    let Some(default) = &spec.destination.default else {
        return Ok(());
    };
    let name = spec.destination_field();
    backend
        .assign_default(&spec.destination_table, name, Some(default))
        .map_err(|source| {
            MigrationError::backend(
                format!("assigning default to {}.{name}", spec.destination_table),
                source,
            )
        })
}

/// Full scan of the source table keyed by join value; null keys are skipped.
fn build_cache<B: Backend + ?Sized>(
    backend: &mut B,
    spec: &FieldTransferSpec,
) -> Result<HashMap<ValueKey, FieldValue>> {
    info!(table = %spec.source_table, "building data cache");
    let columns = [spec.source_key.clone(), spec.source_field.clone()];
    let rows = backend
        .search(&spec.source_table, &columns, Some("1=1"))
        .map_err(|source| {
            MigrationError::backend(format!("scanning {}", spec.source_table), source)
        })?;

    let mut cache = HashMap::with_capacity(rows.len());
    for row in rows {
        let mut values = row.into_iter();
        let (Some(key), Some(value)) = (values.next(), values.next()) else {
            return Err(MigrationError::InvalidState(format!(
                "scan of {} returned a short row",
                spec.source_table
            )));
        };
        if let Some(key) = key.join_key() {
            cache.insert(key, value);
        }
    }
    Ok(cache)
}

fn apply_cache<B: Backend + ?Sized>(
    backend: &mut B,
    spec: &FieldTransferSpec,
    cache: &HashMap<ValueKey, FieldValue>,
    result: &mut TransferResult,
) -> Result<()> {
    info!(table = %spec.destination_table, "updating new field data");
    let columns = [
        spec.destination_key.clone(),
        spec.destination_field().to_string(),
    ];
    let scan_error = |source: BackendError| {
        MigrationError::backend(format!("scanning {}", spec.destination_table), source)
    };
    let mut cursor = backend
        .update_cursor(&spec.destination_table, &columns)
        .map_err(scan_error)?;

    while let Some(row) = cursor.next_row() {
        let row = row.map_err(scan_error)?;
        let Some(key) = row.first() else {
            result.rows_unmatched += 1;
            continue;
        };
        let Some(value) = key.join_key().and_then(|join| cache.get(&join)) else {
            result.rows_unmatched += 1;
            continue;
        };

        let item = format!("{}[{}]", spec.destination_table, key.key());
        match cursor.update_row(vec![key.clone(), value.clone()]) {
            Ok(()) => result.rows_written += 1,
            Err(err) => {
                warn!(row = %item, error = %err, "update failed");
                result
                    .failures
                    .push(ItemFailure::new(item, Some(err.code.clone()), err.message));
            }
        }
    }
    Ok(())
}
