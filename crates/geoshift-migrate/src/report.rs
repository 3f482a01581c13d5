use std::fmt;

use serde::Serialize;

use crate::orchestrator::Step;
use crate::transfer::TransferResult;

/// Final state of one orchestrator step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    /// Finished, but some items failed and were skipped.
    CompletedWithFailures,
    /// Aborted the run.
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::CompletedWithFailures => write!(f, "completed with failures"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A per-item failure: the item was skipped and the run went on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Table, domain, field, or row the failure belongs to.
    pub item: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl ItemFailure {
    pub fn new(item: impl Into<String>, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub status: StepStatus,
    pub failures: Vec<ItemFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transfers: Vec<TransferResult>,
}

impl StepReport {
    pub(crate) fn new(step: Step) -> Self {
        Self {
            step,
            status: StepStatus::Completed,
            failures: Vec::new(),
            transfers: Vec::new(),
        }
    }

    pub(crate) fn fail_item(&mut self, failure: ItemFailure) {
        self.failures.push(failure);
        self.status = StepStatus::CompletedWithFailures;
    }
}

/// Report for one orchestrator run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub steps: Vec<StepReport>,
    /// Tables un-versioned by this run and restored by re-versioning.
    pub tables: Vec<String>,
    /// Set when the run stopped early on request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_after: Option<Step>,
}

impl MigrationReport {
    pub fn failure_count(&self) -> usize {
        self.steps.iter().map(|step| step.failures.len()).sum()
    }

    /// True when every executed step completed without item failures.
    pub fn is_clean(&self) -> bool {
        self.steps
            .iter()
            .all(|step| step.status == StepStatus::Completed)
    }

    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|report| report.step == step)
    }
}
