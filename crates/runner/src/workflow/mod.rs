//! Sequential workflow orchestration
//!
//! A [`Workflow`] is an ordered list of [`WorkflowStep`]s driven one at a
//! time over a shared [`WorkflowContext`]. A failing mandatory step aborts
//! the run and the remaining steps are reported as skipped; a failing
//! advisory step is recorded and the run continues.
//!
//! ```ignore
//! let result = Workflow::builder(collaborators)
//!     .recipes(recipes)
//!     .install_tool()
//!     .analyze_dependencies()
//!     .add_repositories()
//!     .run_recipes()
//!     .notify()
//!     .build()?
//!     .execute()
//!     .await;
//! ```

mod builder;
mod collaborators;
mod context;
mod report;
mod state;
mod step;
mod steps;

pub use builder::WorkflowBuilder;
pub use collaborators::Collaborators;
pub use context::WorkflowContext;
pub use report::WorkflowReport;
pub use state::{WorkflowResult, WorkflowState, WorkflowStatus};
pub use step::{FnStep, StepAction, WorkflowStep};
pub use steps::{
    AddRepositoriesStep, AnalyzeDependenciesStep, CleanupStep, EnvironmentCheckStep,
    InstallToolStep, NotifyStep, PersistReportStep, RunRecipesStep, VerifyTrustStep,
};

use autobake_config::WorkflowSettings;
use autobake_core::{Error, RecipeIdentifier};
use autobake_utils::tracing::step_span;
use std::time::Instant;
use tracing::Instrument;

/// A configured run, ready to execute
pub struct Workflow {
    settings: WorkflowSettings,
    collaborators: Collaborators,
    recipes: Vec<RecipeIdentifier>,
    steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn builder(collaborators: Collaborators) -> WorkflowBuilder {
        WorkflowBuilder::new(collaborators)
    }

    pub(crate) fn new(
        settings: WorkflowSettings,
        collaborators: Collaborators,
        recipes: Vec<RecipeIdentifier>,
        steps: Vec<WorkflowStep>,
    ) -> Self {
        Self {
            settings,
            collaborators,
            recipes,
            steps,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn recipes(&self) -> &[RecipeIdentifier] {
        &self.recipes
    }

    /// Step names in run order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(WorkflowStep::name).collect()
    }

    /// Run every step in order and report what happened
    pub async fn execute(self) -> WorkflowResult {
        let clock = Instant::now();
        let title = self.settings.title.clone();

        tracing::info!(
            title = %title,
            steps = self.steps.len(),
            recipes = self.recipes.len(),
            "workflow started"
        );

        let mut ctx = WorkflowContext::new(self.settings, self.collaborators, self.recipes);
        ctx.state.status = WorkflowStatus::Running;
        let mut steps = self.steps.into_iter().enumerate();
        let mut aborted_at = None;

        for (index, step) in steps.by_ref() {
            let outcome = step
                .action
                .execute(&mut ctx)
                .instrument(step_span(&step.name, index))
                .await;

            match outcome {
                Ok(()) => {
                    tracing::info!(step = %step.name, "step completed");
                    ctx.state.record_success(&step.name);
                }
                Err(error) => {
                    let error = match error {
                        Error::Step { .. } => error,
                        other => Error::step_with_source(&step.name, other),
                    };
                    if step.continue_on_error {
                        tracing::warn!(
                            step = %step.name,
                            error = %error,
                            "advisory step failed, continuing"
                        );
                        ctx.state.record_failure(&step.name, error);
                    } else {
                        tracing::error!(
                            step = %step.name,
                            error = %error,
                            "mandatory step failed, aborting"
                        );
                        ctx.state.record_failure(&step.name, error);
                        aborted_at = Some(step.name);
                        break;
                    }
                }
            }
        }

        let skipped_steps: Vec<String> = steps.map(|(_, step)| step.name).collect();
        let status = if aborted_at.is_some() {
            WorkflowStatus::Aborted
        } else {
            WorkflowStatus::Completed
        };
        ctx.state.status = status;
        let batch_summary = ctx.batch_summary().copied();

        tracing::info!(
            status = %status,
            completed = ctx.state.completed_steps.len(),
            failed = ctx.state.failed_steps.len(),
            skipped = skipped_steps.len(),
            "workflow finished"
        );

        WorkflowResult::from_state(
            title,
            ctx.state,
            status,
            clock.elapsed(),
            aborted_at,
            skipped_steps,
            batch_summary,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autobake_core::testing::{
        ScriptedExecutor, StaticMetadataSource, StaticRepositoryRegistry, StubPackagingTool,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn collaborators() -> Collaborators {
        Collaborators::new(
            Arc::new(ScriptedExecutor::new()),
            Arc::new(StaticMetadataSource::new()),
            Arc::new(StaticRepositoryRegistry::new()),
            Arc::new(StubPackagingTool::installed()),
        )
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&order);
        let second = Arc::clone(&order);

        let workflow = Workflow::builder(collaborators())
            .step(FnStep::mandatory("first", move |ctx| {
                assert_eq!(ctx.status(), WorkflowStatus::Running);
                first.lock().push("first");
                Ok(())
            }))
            .step(FnStep::advisory("second", move |_| {
                second.lock().push("second");
                Ok(())
            }))
            .build()
            .unwrap();
        assert_eq!(workflow.step_names(), vec!["first", "second"]);

        let result = workflow.execute().await;
        assert_eq!(result.status, WorkflowStatus::Completed);
        assert_eq!(result.completed_steps, vec!["first", "second"]);
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_failures_are_wrapped_as_step_errors() {
        let result = Workflow::builder(collaborators())
            .step(FnStep::advisory("flaky", |_| anyhow::bail!("socket closed")))
            .build()
            .unwrap()
            .execute()
            .await;

        assert!(result.success);
        match result.error("flaky") {
            Some(Error::Step { step, message, .. }) => {
                assert_eq!(step, "flaky");
                assert_eq!(message, "socket closed");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_step_names_are_rejected() {
        let err = Workflow::builder(collaborators())
            .notify()
            .notify()
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let result = Workflow::builder(collaborators())
            .default_concurrency(0)
            .build();
        assert!(result.is_err());

        let result = Workflow::builder(collaborators())
            .webhook_url("ftp://hooks.example")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_recipes_are_deduplicated() {
        let recipe = RecipeIdentifier::new("Firefox.install").unwrap();
        let workflow = Workflow::builder(collaborators())
            .recipes([recipe.clone(), recipe.clone()])
            .build()
            .unwrap();
        assert_eq!(workflow.recipes(), &[recipe]);
    }

    #[test]
    fn test_recipes_from_file_merge_with_explicit_recipes() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("recipes.txt");
        std::fs::write(&list, "# nightly\nFirefox.install\nZoom.pkg\n").unwrap();

        let workflow = Workflow::builder(collaborators())
            .recipes([RecipeIdentifier::new("Zoom.pkg").unwrap()])
            .recipes_from_file(&list)
            .unwrap()
            .build()
            .unwrap();
        let names: Vec<&str> = workflow.recipes().iter().map(|r| r.as_str()).collect();
        assert_eq!(names, vec!["Zoom.pkg.recipe", "Firefox.install.recipe"]);

        let missing = Workflow::builder(collaborators()).recipes_from_file(dir.path().join("nope"));
        assert!(missing.is_err());
    }
}
