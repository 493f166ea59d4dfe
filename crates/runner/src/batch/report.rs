//! Machine-readable batch reports

use super::result::{serialize_millis, BatchOutcome, BatchSummary};
use autobake_core::{RecipeIdentifier, ReportSink, Result, ResultExt};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// One recipe's line in a [`BatchReport`]
#[derive(Debug, Clone, Serialize)]
pub struct RecipeReportEntry {
    pub identifier: RecipeIdentifier,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub output: String,
}

/// Summary plus per-recipe entries, sorted by identifier
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub summary: BatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recipes: Vec<RecipeReportEntry>,
}

impl BatchReport {
    pub fn from_outcome(outcome: &BatchOutcome) -> Self {
        let mut recipes: Vec<RecipeReportEntry> = outcome
            .results
            .iter()
            .map(|result| RecipeReportEntry {
                identifier: result.identifier.clone(),
                success: result.is_success(),
                error: result.execution_error.as_ref().map(|e| e.message.clone()),
                exit_code: result.execution_error.as_ref().and_then(|e| e.exit_code),
                started_at: result.started_at,
                duration: result.duration,
                output: result.output.clone(),
            })
            .collect();
        recipes.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        Self {
            generated_at: Utc::now(),
            summary: outcome.summary,
            error: outcome.error.as_ref().map(ToString::to_string),
            recipes,
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).context("serializing batch report")
    }

    /// Hand the report to `sink` for storage at `path`
    pub async fn persist(&self, sink: &dyn ReportSink, path: &Path) -> Result<()> {
        let value = self.to_value()?;
        sink.persist(path, &value).await?;
        tracing::info!(
            path = %path.display(),
            recipes = self.recipes.len(),
            "batch report written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchEngine, BatchTask};
    use autobake_config::BatchOptions;
    use autobake_core::testing::{MemoryReportSink, ScriptedExecutor};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_report_is_sorted_and_persisted() {
        let engine = BatchEngine::new(Arc::new(ScriptedExecutor::new().fail("Zoom.pkg", Some(1))));
        let tasks = ["Zoom.pkg", "Firefox.install", "Slack.download"]
            .iter()
            .map(|n| BatchTask::new(RecipeIdentifier::new(n).unwrap()))
            .collect();
        let outcome = engine.run(tasks, &BatchOptions::default()).await;

        let report = BatchReport::from_outcome(&outcome);
        let names: Vec<&str> = report.recipes.iter().map(|r| r.identifier.name()).collect();
        assert_eq!(names, vec!["Firefox.install", "Slack.download", "Zoom.pkg"]);

        let sink = MemoryReportSink::new();
        report.persist(&sink, Path::new("report.json")).await.unwrap();
        let stored = sink.reports();
        assert_eq!(stored.len(), 1);
        let json = &stored[0].1;
        assert_eq!(json["summary"]["failed"], 1);
        assert_eq!(json["recipes"][2]["exit_code"], 1);
        assert_eq!(json["recipes"][0]["success"], true);
        assert!(json["recipes"][0].get("error").is_none());
    }
}
