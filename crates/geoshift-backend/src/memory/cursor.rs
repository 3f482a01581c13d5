use std::collections::BTreeSet;

use geoshift_core::{FieldValue, Row, TableSnapshot};

use super::codes;
use crate::adapter::UpdateCursor;
use crate::error::{BackendError, BackendResult};

/// Update cursor over the rows of one in-memory table.
pub(super) struct MemoryUpdateCursor<'a> {
    pub(super) table: &'a mut TableSnapshot,
    pub(super) columns: Vec<usize>,
    pub(super) failing: BTreeSet<usize>,
    pub(super) writes: &'a mut u64,
    pub(super) next: usize,
    pub(super) current: Option<usize>,
}

impl UpdateCursor for MemoryUpdateCursor<'_> {
    fn next_row(&mut self) -> Option<BackendResult<Row>> {
        let row = self.table.rows.get(self.next)?;
        let projected = self
            .columns
            .iter()
            .map(|column| row.get(*column).cloned().unwrap_or(FieldValue::Null))
            .collect();
        self.current = Some(self.next);
        self.next += 1;
        Some(Ok(projected))
    }

    fn update_row(&mut self, values: Row) -> BackendResult<()> {
        let index = self.current.ok_or_else(|| {
            BackendError::new(codes::CURSOR_NOT_POSITIONED, "update before first row")
        })?;

        if values.len() != self.columns.len() {
            return Err(BackendError::new(
                codes::ROW_WRITE_FAILED,
                format!(
                    "expected {} values, got {}",
                    self.columns.len(),
                    values.len()
                ),
            ));
        }

        if self.failing.contains(&index) {
            return Err(BackendError::new(
                codes::ROW_WRITE_FAILED,
                format!("row {index} of {} could not be written", self.table.name),
            ));
        }

        let row = self.table.rows.get_mut(index).ok_or_else(|| {
            BackendError::new(codes::ROW_WRITE_FAILED, format!("row {index} vanished"))
        })?;
        for (column, value) in self.columns.iter().zip(values) {
            if let Some(cell) = row.get_mut(*column) {
                *cell = value;
            }
        }
        *self.writes += 1;

        Ok(())
    }
}
