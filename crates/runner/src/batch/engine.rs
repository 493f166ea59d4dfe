//! Bounded worker pool for recipe batches

use super::result::{BatchOutcome, BatchResult, BatchResults};
use super::task::BatchTask;
use autobake_config::BatchOptions;
use autobake_core::{Error, RecipeExecutor, RecipeIdentifier, Result};
use autobake_utils::tracing::{batch_span, recipe_completed, recipe_span};
use chrono::Utc;
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Shared queue with a cooperative stop flag.
///
/// The flag is read and written under the queue lock, so once `stop`
/// returns no worker can dequeue another task.
struct WorkQueue {
    pending: Mutex<VecDeque<BatchTask>>,
    stopped: AtomicBool,
    first_failure: Mutex<Option<RecipeIdentifier>>,
    first_panic: Mutex<Option<String>>,
}

impl WorkQueue {
    fn new(tasks: Vec<BatchTask>) -> Self {
        Self {
            pending: Mutex::new(tasks.into()),
            stopped: AtomicBool::new(false),
            first_failure: Mutex::new(None),
            first_panic: Mutex::new(None),
        }
    }

    fn next(&self) -> Option<BatchTask> {
        let mut pending = self.pending.lock();
        if self.stopped.load(Ordering::Acquire) {
            return None;
        }
        pending.pop_front()
    }

    fn stop(&self) {
        let _pending = self.pending.lock();
        self.stopped.store(true, Ordering::Release);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Record a failure and stop handing out work
    fn fail(&self, identifier: &RecipeIdentifier) {
        self.first_failure
            .lock()
            .get_or_insert_with(|| identifier.clone());
        self.stop();
    }

    fn first_failure(&self) -> Option<RecipeIdentifier> {
        self.first_failure.lock().clone()
    }

    fn record_panic(&self, message: String) {
        self.first_panic.lock().get_or_insert(message);
    }

    fn first_panic(&self) -> Option<String> {
        self.first_panic.lock().clone()
    }
}

/// Everything one worker needs, owned so the worker can be spawned
struct Worker {
    index: usize,
    executor: Arc<dyn RecipeExecutor>,
    queue: Arc<WorkQueue>,
    results: Arc<DashMap<RecipeIdentifier, BatchResult>>,
    stop_on_first_error: bool,
    verbose_level: u8,
}

impl Worker {
    async fn run(self) {
        while let Some(task) = self.queue.next() {
            let verbose_level = task.effective_verbosity(self.verbose_level);
            let started_at = Utc::now();
            let clock = Instant::now();

            let execution = self
                .executor
                .execute(&task.identifier, task.overrides_dir(), verbose_level)
                .instrument(recipe_span(task.identifier.as_str(), self.index));
            let outcome = match AssertUnwindSafe(execution).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = format!(
                        "recipe '{}' panicked: {}",
                        task.identifier,
                        panic_message(payload.as_ref())
                    );
                    tracing::error!(worker = self.index, %message, "executor panicked");
                    self.queue.record_panic(message.clone());
                    Err(Error::engine(message))
                }
            };

            let result = BatchResult::from_execution(
                task.identifier.clone(),
                outcome,
                started_at,
                clock.elapsed(),
            );
            recipe_completed(
                task.identifier.as_str(),
                result.duration.as_millis().try_into().unwrap_or(u64::MAX),
                result.is_success(),
            );

            if !result.is_success() && self.stop_on_first_error {
                self.queue.fail(&task.identifier);
            }
            self.results.insert(task.identifier, result);
        }
        tracing::debug!(worker = self.index, "worker finished");
    }
}

/// Runs batches of recipes through a [`RecipeExecutor`]
#[derive(Clone)]
pub struct BatchEngine {
    executor: Arc<dyn RecipeExecutor>,
}

impl BatchEngine {
    pub fn new(executor: Arc<dyn RecipeExecutor>) -> Self {
        Self { executor }
    }

    /// Run every task, returning partial results alongside any engine error
    pub async fn run(&self, tasks: Vec<BatchTask>, options: &BatchOptions) -> BatchOutcome {
        let total = tasks.len();
        if let Err(e) = validate(&tasks, options) {
            tracing::error!(error = %e, "batch rejected");
            return BatchOutcome::rejected(total, e);
        }

        let span = batch_span(total, options.max_concurrency);
        self.drive(tasks, options).instrument(span).await
    }

    /// Run every task and fail on any engine-level error
    pub async fn run_batch(
        &self,
        tasks: Vec<BatchTask>,
        options: &BatchOptions,
    ) -> Result<BatchResults> {
        self.run(tasks, options).await.into_result()
    }

    async fn drive(&self, tasks: Vec<BatchTask>, options: &BatchOptions) -> BatchOutcome {
        let total = tasks.len();
        let started = Instant::now();
        if tasks.is_empty() {
            tracing::debug!("empty batch");
            return BatchOutcome::new(BatchResults::default(), None);
        }

        let workers = options.max_concurrency.min(total);
        let queue = Arc::new(WorkQueue::new(tasks));
        let results = Arc::new(DashMap::with_capacity(total));

        tracing::info!(
            total_tasks = total,
            workers,
            stop_on_first_error = options.stop_on_first_error,
            "starting batch"
        );

        let mut join_set = JoinSet::new();
        for index in 0..workers {
            let worker = Worker {
                index,
                executor: Arc::clone(&self.executor),
                queue: Arc::clone(&queue),
                results: Arc::clone(&results),
                stop_on_first_error: options.stop_on_first_error,
                verbose_level: options.verbose_level,
            };
            join_set.spawn(worker.run().in_current_span());
        }

        let deadline = options
            .timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);
        let mut timed_out = false;
        let mut crashed: Option<String> = None;

        loop {
            let joined = match deadline.filter(|_| !timed_out) {
                Some(deadline) => tokio::select! {
                    joined = join_set.join_next() => Some(joined),
                    () = tokio::time::sleep_until(deadline) => None,
                },
                None => Some(join_set.join_next().await),
            };

            match joined {
                // Deadline passed; in-flight recipes are left to finish
                None => {
                    timed_out = true;
                    queue.stop();
                    tracing::warn!(
                        in_flight = join_set.len(),
                        "batch timeout reached, no further recipes will start"
                    );
                }
                Some(None) => break,
                Some(Some(Ok(()))) => {}
                Some(Some(Err(e))) => {
                    tracing::error!(error = %e, "batch worker crashed");
                    crashed.get_or_insert_with(|| e.to_string());
                }
            }
        }

        let collected = results
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let results = BatchResults::new(collected, total, started.elapsed());
        let summary = results.summary();

        let error = if let Some(message) = crashed.or_else(|| queue.first_panic()) {
            Some(Error::engine(format!("batch worker panicked: {message}")))
        } else if timed_out {
            options
                .timeout
                .map(|timeout| Error::timeout("recipe batch", timeout))
        } else if queue.is_stopped() {
            queue.first_failure().map(|identifier| {
                Error::engine(format!(
                    "stopped after first failure: recipe '{identifier}' failed, \
                     {} task(s) not attempted",
                    summary.not_attempted
                ))
            })
        } else {
            None
        };

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            not_attempted = summary.not_attempted,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "batch finished"
        );

        BatchOutcome::new(results, error)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn validate(tasks: &[BatchTask], options: &BatchOptions) -> Result<()> {
    options.validate()?;

    let mut seen = HashSet::with_capacity(tasks.len());
    let duplicates: Vec<&str> = tasks
        .iter()
        .filter(|task| !seen.insert(&task.identifier))
        .map(|task| task.identifier.as_str())
        .collect();
    if !duplicates.is_empty() {
        return Err(Error::configuration(format!(
            "duplicate recipes in batch: {}",
            duplicates.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autobake_core::testing::ScriptedExecutor;
    use proptest::prelude::*;
    use std::time::Duration;

    fn id(name: &str) -> RecipeIdentifier {
        RecipeIdentifier::new(name).unwrap()
    }

    fn tasks(names: &[&str]) -> Vec<BatchTask> {
        names.iter().map(|n| BatchTask::new(id(n))).collect()
    }

    #[tokio::test]
    async fn test_all_tasks_run_without_stop_flag() {
        let executor = Arc::new(ScriptedExecutor::new().fail("B", Some(1)));
        let engine = BatchEngine::new(executor.clone());

        let outcome = engine
            .run(tasks(&["A", "B", "C", "D"]), &BatchOptions::default().with_max_concurrency(2))
            .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.results.len(), 4);
        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.results.failed(), vec![&id("B")]);
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_stop_on_first_error() {
        // Task 3 fails before tasks 4 and 5 could start
        let executor = Arc::new(
            ScriptedExecutor::new()
                .with_default_delay(Duration::from_millis(20))
                .with_delay("T3", Duration::from_millis(1))
                .fail("T3", Some(2)),
        );
        let engine = BatchEngine::new(executor.clone());
        let options = BatchOptions::default()
            .with_max_concurrency(2)
            .with_stop_on_first_error(true);

        let outcome = engine
            .run(tasks(&["T1", "T2", "T3", "T4", "T5"]), &options)
            .await;

        let len = outcome.results.len();
        assert!((3..=5).contains(&len), "unexpected result count {len}");
        assert!(!outcome.results.get(&id("T3")).unwrap().is_success());
        for result in outcome.results.iter() {
            assert!(executor.executed().contains(&result.identifier.to_string()));
        }
        match outcome.error {
            Some(Error::Engine { message }) => assert!(message.contains("T3.recipe")),
            other => panic!("expected engine error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_worker_panic_is_recorded_and_batch_continues() {
        let executor = Arc::new(ScriptedExecutor::new().panic_on("B"));
        let engine = BatchEngine::new(executor.clone());

        let outcome = engine
            .run(tasks(&["A", "B", "C"]), &BatchOptions::default().with_max_concurrency(1))
            .await;

        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.results.failed(), vec![&id("B")]);
        assert!(outcome.results.get(&id("C")).unwrap().is_success());
        assert_eq!(outcome.summary.not_attempted, 0);
        let failure = outcome.results.get(&id("B")).unwrap();
        assert!(failure
            .execution_error
            .as_ref()
            .is_some_and(|e| e.message.contains("executor blew up on B.recipe")));
        match outcome.error {
            Some(Error::Engine { message }) => {
                assert!(message.contains("batch worker panicked"));
                assert!(message.contains("B.recipe"));
            }
            other => panic!("expected engine error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_worker_panic_counts_as_failure_when_stopping_early() {
        let executor = Arc::new(ScriptedExecutor::new().panic_on("A"));
        let engine = BatchEngine::new(executor.clone());
        let options = BatchOptions::default()
            .with_max_concurrency(1)
            .with_stop_on_first_error(true);

        let outcome = engine.run(tasks(&["A", "B"]), &options).await;

        assert_eq!(executor.executed(), vec!["A.recipe"]);
        assert_eq!(outcome.summary.not_attempted, 1);
        // The panic takes precedence over the early stop
        match outcome.error {
            Some(Error::Engine { message }) => assert!(message.contains("panicked")),
            other => panic!("expected engine error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_never_exceeds_concurrency() {
        let executor =
            Arc::new(ScriptedExecutor::new().with_default_delay(Duration::from_millis(10)));
        let engine = BatchEngine::new(executor.clone());
        let names: Vec<String> = (0..12).map(|i| format!("Recipe{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let results = engine
            .run_batch(tasks(&refs), &BatchOptions::default().with_max_concurrency(3))
            .await
            .unwrap();

        assert_eq!(results.len(), 12);
        assert!(executor.peak_concurrency() <= 3);
    }

    #[tokio::test]
    async fn test_timeout_returns_partial_results() {
        let executor =
            Arc::new(ScriptedExecutor::new().with_default_delay(Duration::from_millis(50)));
        let engine = BatchEngine::new(executor.clone());
        let options = BatchOptions::default()
            .with_max_concurrency(1)
            .with_timeout(Duration::from_millis(75));

        let outcome = engine.run(tasks(&["A", "B", "C", "D"]), &options).await;

        assert!(matches!(outcome.error, Some(Error::Timeout { .. })));
        // The recipe in flight at the deadline still completes
        assert!(outcome.results.len() >= 1 && outcome.results.len() < 4);
        assert_eq!(outcome.results.len(), executor.executed().len());
        assert!(outcome.results.iter().all(BatchResult::is_success));
    }

    #[tokio::test]
    async fn test_validation_happens_before_execution() {
        let executor = Arc::new(ScriptedExecutor::new());
        let engine = BatchEngine::new(executor.clone());

        let outcome = engine
            .run(tasks(&["A"]), &BatchOptions::default().with_max_concurrency(0))
            .await;
        assert!(matches!(outcome.error, Some(Error::Engine { .. })));

        let err = engine
            .run_batch(tasks(&["A", "B", "A"]), &BatchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(executor.executed().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let engine = BatchEngine::new(Arc::new(ScriptedExecutor::new()));
        let results = engine
            .run_batch(Vec::new(), &BatchOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_verbosity_and_overrides_reach_executor() {
        let engine = BatchEngine::new(Arc::new(ScriptedExecutor::new()));
        let batch = vec![
            BatchTask::new(id("Quiet")),
            BatchTask::new(id("Loud"))
                .with_verbose_level(3)
                .with_overrides_dir("/tmp/overrides"),
        ];

        let results = engine
            .run_batch(batch, &BatchOptions::default().with_verbose_level(1))
            .await
            .unwrap();

        assert_eq!(
            results.get(&id("Quiet")).unwrap().output,
            "Processing Quiet.recipe (verbosity 1)"
        );
        assert_eq!(
            results.get(&id("Loud")).unwrap().output,
            "Processing Loud.recipe (verbosity 3)"
        );
    }

    #[tokio::test]
    async fn test_rerun_is_stable() {
        let executor = Arc::new(ScriptedExecutor::new().fail("B", None));
        let engine = BatchEngine::new(executor);
        let options = BatchOptions::default().with_max_concurrency(2);

        let first = engine.run(tasks(&["A", "B", "C"]), &options).await;
        let second = engine.run(tasks(&["A", "B", "C"]), &options).await;

        for result in first.results.iter() {
            let again = second.results.get(&result.identifier).unwrap();
            assert_eq!(result.is_success(), again.is_success());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_every_task_yields_one_result(
            count in 1usize..20,
            concurrency in 1usize..6,
            failing in proptest::collection::vec(any::<bool>(), 20),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let names: Vec<String> = (0..count).map(|i| format!("Recipe{i}")).collect();
            let mut executor = ScriptedExecutor::new();
            for (name, fail) in names.iter().zip(&failing) {
                if *fail {
                    executor = executor.fail(name, Some(1));
                }
            }
            let engine = BatchEngine::new(Arc::new(executor));
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let options = BatchOptions::default().with_max_concurrency(concurrency);

            let outcome = runtime.block_on(engine.run(tasks(&refs), &options));

            prop_assert!(outcome.error.is_none());
            prop_assert_eq!(outcome.results.len(), count);
            let expected_failures = failing.iter().take(count).filter(|f| **f).count();
            prop_assert_eq!(outcome.summary.failed, expected_failures);
        }
    }
}
