use super::context::WorkflowContext;
use super::state::{WorkflowResult, WorkflowStatus};
use crate::batch::BatchSummary;
use autobake_core::{RecipeIdentifier, ReportSink, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;

/// JSON form of a workflow run, with errors rendered as text
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub title: String,
    pub status: WorkflowStatus,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub completed_steps: Vec<String>,
    pub failed_steps: Vec<String>,
    pub errors: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted_at: Option<String>,
    pub processed_recipes: Vec<RecipeIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchSummary>,
}

impl WorkflowReport {
    /// Report for a run still in progress
    pub(crate) fn snapshot(ctx: &WorkflowContext) -> Self {
        let state = ctx.state();
        let now = Utc::now();
        Self {
            title: ctx.settings().title.clone(),
            status: state.status,
            success: state.failed_steps.is_empty(),
            started_at: state.started_at,
            generated_at: now,
            elapsed_ms: (now - state.started_at).num_milliseconds().max(0) as u64,
            completed_steps: state.completed_steps.clone(),
            failed_steps: state.failed_steps.clone(),
            errors: state
                .errors_by_step
                .iter()
                .map(|(step, error)| (step.clone(), error.to_string()))
                .collect(),
            skipped_steps: Vec::new(),
            aborted_at: None,
            processed_recipes: state.processed_recipes.iter().cloned().collect(),
            batch: ctx.batch_summary().copied(),
        }
    }

    pub fn from_result(result: &WorkflowResult) -> Self {
        Self {
            title: result.title.clone(),
            status: result.status,
            success: result.success,
            started_at: result.started_at,
            generated_at: Utc::now(),
            elapsed_ms: result.elapsed.as_millis().try_into().unwrap_or(u64::MAX),
            completed_steps: result.completed_steps.clone(),
            failed_steps: result.failed_steps.clone(),
            errors: result
                .errors_by_step
                .iter()
                .map(|(step, error)| (step.clone(), error.to_string()))
                .collect(),
            skipped_steps: result.skipped_steps.clone(),
            aborted_at: result.aborted_at.clone(),
            processed_recipes: result.processed_recipes.clone(),
            batch: result.batch_summary,
        }
    }

    pub async fn persist(&self, sink: &dyn ReportSink, path: &Path) -> Result<()> {
        let value = serde_json::to_value(self)?;
        sink.persist(path, &value).await
    }
}

impl WorkflowResult {
    pub fn report(&self) -> WorkflowReport {
        WorkflowReport::from_result(self)
    }
}
