//! Per-recipe results and batch aggregates

use autobake_core::{Error, RecipeIdentifier, Result};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::time::Duration;

pub(crate) fn serialize_millis<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis().try_into().unwrap_or(u64::MAX))
}

/// Why a single recipe failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionFailure {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// Outcome of one attempted recipe
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub identifier: RecipeIdentifier,
    pub output: String,
    pub execution_error: Option<ExecutionFailure>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl BatchResult {
    /// Build a result from what the executor returned.
    ///
    /// Output captured alongside a task failure is kept on the result.
    pub(crate) fn from_execution(
        identifier: RecipeIdentifier,
        outcome: Result<String>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let (output, execution_error) = match outcome {
            Ok(output) => (output, None),
            Err(error) => {
                let exit_code = error.exit_code();
                let message = error.to_string();
                let output = match error {
                    Error::TaskExecution { output, .. } => output,
                    _ => String::new(),
                };
                (output, Some(ExecutionFailure { message, exit_code }))
            }
        };

        Self {
            identifier,
            output,
            execution_error,
            started_at,
            duration,
        }
    }

    pub fn is_success(&self) -> bool {
        self.execution_error.is_none()
    }
}

/// Counts describing a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total_tasks: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub not_attempted: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.not_attempted == 0
    }
}

/// Results of every attempted recipe, keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct BatchResults {
    results: HashMap<RecipeIdentifier, BatchResult>,
    total_tasks: usize,
    elapsed: Duration,
}

impl BatchResults {
    pub(crate) fn new(
        results: HashMap<RecipeIdentifier, BatchResult>,
        total_tasks: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            results,
            total_tasks,
            elapsed,
        }
    }

    pub fn get(&self, identifier: &RecipeIdentifier) -> Option<&BatchResult> {
        self.results.get(identifier)
    }

    pub fn contains(&self, identifier: &RecipeIdentifier) -> bool {
        self.results.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &BatchResult> {
        self.results.values()
    }

    pub fn succeeded(&self) -> Vec<&RecipeIdentifier> {
        let mut ids: Vec<_> = self
            .iter()
            .filter(|r| r.is_success())
            .map(|r| &r.identifier)
            .collect();
        ids.sort();
        ids
    }

    pub fn failed(&self) -> Vec<&RecipeIdentifier> {
        let mut ids: Vec<_> = self
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| &r.identifier)
            .collect();
        ids.sort();
        ids
    }

    pub fn summary(&self) -> BatchSummary {
        let succeeded = self.iter().filter(|r| r.is_success()).count();
        let attempted = self.results.len();
        BatchSummary {
            total_tasks: self.total_tasks,
            attempted,
            succeeded,
            failed: attempted - succeeded,
            not_attempted: self.total_tasks.saturating_sub(attempted),
            elapsed: self.elapsed,
        }
    }
}

impl IntoIterator for BatchResults {
    type Item = (RecipeIdentifier, BatchResult);
    type IntoIter = std::collections::hash_map::IntoIter<RecipeIdentifier, BatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Everything a batch run produced, including an engine-level error
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: BatchResults,
    pub summary: BatchSummary,
    pub error: Option<Error>,
}

impl BatchOutcome {
    pub(crate) fn new(results: BatchResults, error: Option<Error>) -> Self {
        let summary = results.summary();
        Self {
            results,
            summary,
            error,
        }
    }

    /// An outcome for a batch rejected before any worker started
    pub(crate) fn rejected(total_tasks: usize, error: Error) -> Self {
        Self::new(
            BatchResults::new(HashMap::new(), total_tasks, Duration::ZERO),
            Some(error),
        )
    }

    /// True when no engine error occurred and every task succeeded
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.summary.all_succeeded()
    }

    /// Surface the engine-level error, discarding partial results
    pub fn into_result(self) -> Result<BatchResults> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> RecipeIdentifier {
        RecipeIdentifier::new(name).unwrap()
    }

    fn result(name: &str, outcome: Result<String>) -> (RecipeIdentifier, BatchResult) {
        (
            id(name),
            BatchResult::from_execution(id(name), outcome, Utc::now(), Duration::from_millis(5)),
        )
    }

    #[test]
    fn test_task_failure_keeps_output_and_exit_code() {
        let (_, result) = result(
            "Zoom.pkg",
            Err(Error::task_execution_with_output(
                "Zoom.pkg.recipe",
                "download failed",
                Some(1),
                "curl: (22) 404",
            )),
        );

        assert!(!result.is_success());
        assert_eq!(result.output, "curl: (22) 404");
        let failure = result.execution_error.unwrap();
        assert_eq!(failure.exit_code, Some(1));
        assert!(failure.message.contains("download failed"));
    }

    #[test]
    fn test_summary_counts() {
        let results = BatchResults::new(
            HashMap::from([
                result("A", Ok("ok".into())),
                result("B", Err(Error::engine("boom"))),
            ]),
            4,
            Duration::from_secs(2),
        );

        let summary = results.summary();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_attempted, 2);
        assert!(!summary.all_succeeded());
        assert_eq!(results.failed(), vec![&id("B")]);

        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["elapsed_ms"], 2000);
    }

    #[test]
    fn test_into_result_surfaces_engine_error() {
        let outcome =
            BatchOutcome::rejected(3, Error::engine("max_concurrency must be at least 1"));
        assert_eq!(outcome.summary.not_attempted, 3);
        assert!(matches!(outcome.into_result(), Err(Error::Engine { .. })));
    }
}
