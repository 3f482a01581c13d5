use geoshift_backend::Backend;
use serde::Serialize;
use tracing::{error, info};

use crate::errors::{MigrationError, Result};
use crate::model::ReferenceSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    Refreshed,
    TruncateFailed,
    /// Truncated, but the append failed; the table is left empty.
    AppendFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshedTable {
    pub table: String,
    pub source: String,
    pub status: RefreshStatus,
    pub rows: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub tables: Vec<RefreshedTable>,
}

impl RefreshReport {
    pub fn failure_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|table| table.status != RefreshStatus::Refreshed)
            .count()
    }
}

/// Truncate each reference table and reload it from its source.
///
/// Nothing is touched unless the schema lock on the first table can be taken.
pub fn refresh_reference<B: Backend + ?Sized>(
    backend: &mut B,
    sources: &[ReferenceSource],
) -> Result<RefreshReport> {
    let mut report = RefreshReport::default();
    let Some(first) = sources.first() else {
        return Ok(report);
    };
    if !backend.test_schema_lock(&first.table) {
        error!(table = %first.table, "unable to acquire the schema lock");
        return Err(MigrationError::LockUnavailable(first.table.clone()));
    }

    for source in sources {
        info!(table = %source.table, source = %source.source, "updating reference table");
        let mut entry = RefreshedTable {
            table: source.table.clone(),
            source: source.source.clone(),
            status: RefreshStatus::Refreshed,
            rows: 0,
            error: None,
        };

        if let Err(err) = backend.truncate_table(&source.table) {
            error!(table = %source.table, error = %err, "truncate failed");
            entry.status = RefreshStatus::TruncateFailed;
            entry.error = Some(err.to_string());
            report.tables.push(entry);
            continue;
        }

        match backend.append(&source.source, &source.table) {
            Ok(rows) => {
                info!(table = %source.table, rows, "reference table updated");
                entry.rows = rows;
            }
            Err(err) => {
                error!(table = %source.table, error = %err, "append failed");
                entry.status = RefreshStatus::AppendFailed;
                entry.error = Some(err.to_string());
            }
        }
        report.tables.push(entry);
    }

    Ok(report)
}
