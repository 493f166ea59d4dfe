use crate::batch::BatchSummary;
use autobake_core::{Error, RecipeIdentifier};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Lifecycle of a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Idle,
    Running,
    Completed,
    Aborted,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowStatus::Idle => "idle",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Bookkeeping accumulated while steps run
#[derive(Debug)]
pub struct WorkflowState {
    pub completed_steps: Vec<String>,
    pub failed_steps: Vec<String>,
    pub errors_by_step: IndexMap<String, Error>,
    pub processed_recipes: IndexSet<RecipeIdentifier>,
    pub started_at: DateTime<Utc>,
    pub status: WorkflowStatus,
}

impl WorkflowState {
    pub(crate) fn new() -> Self {
        Self {
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            errors_by_step: IndexMap::new(),
            processed_recipes: IndexSet::new(),
            started_at: Utc::now(),
            status: WorkflowStatus::Idle,
        }
    }

    pub(crate) fn record_success(&mut self, step: &str) {
        self.completed_steps.push(step.to_string());
    }

    pub(crate) fn record_failure(&mut self, step: &str, error: Error) {
        self.failed_steps.push(step.to_string());
        self.errors_by_step.insert(step.to_string(), error);
    }
}

/// Final snapshot of an executed workflow
#[derive(Debug)]
pub struct WorkflowResult {
    pub title: String,
    pub status: WorkflowStatus,
    /// True when no mandatory step failed
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub completed_steps: Vec<String>,
    pub failed_steps: Vec<String>,
    pub errors_by_step: IndexMap<String, Error>,
    pub processed_recipes: Vec<RecipeIdentifier>,
    /// Steps that never ran because a mandatory step failed
    pub skipped_steps: Vec<String>,
    /// The mandatory step that aborted the run
    pub aborted_at: Option<String>,
    pub batch_summary: Option<BatchSummary>,
}

impl WorkflowResult {
    pub(crate) fn from_state(
        title: String,
        state: WorkflowState,
        status: WorkflowStatus,
        elapsed: Duration,
        aborted_at: Option<String>,
        skipped_steps: Vec<String>,
        batch_summary: Option<BatchSummary>,
    ) -> Self {
        Self {
            title,
            success: status == WorkflowStatus::Completed,
            status,
            started_at: state.started_at,
            elapsed,
            completed_steps: state.completed_steps,
            failed_steps: state.failed_steps,
            errors_by_step: state.errors_by_step,
            processed_recipes: state.processed_recipes.into_iter().collect(),
            skipped_steps,
            aborted_at,
            batch_summary,
        }
    }

    /// The error a step failed with
    pub fn error(&self, step: &str) -> Option<&Error> {
        self.errors_by_step.get(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_follows_status() {
        let mut state = WorkflowState::new();
        state.record_success("check_environment");
        state.record_failure("notify", Error::notification("https://hooks.example", "500"));

        let result = WorkflowResult::from_state(
            "nightly".to_string(),
            state,
            WorkflowStatus::Completed,
            Duration::from_secs(1),
            None,
            Vec::new(),
            None,
        );
        assert!(result.success);
        assert_eq!(result.failed_steps, vec!["notify"]);
        assert!(matches!(result.error("notify"), Some(Error::Notification { .. })));
        assert_eq!(WorkflowStatus::Aborted.to_string(), "aborted");
    }
}
