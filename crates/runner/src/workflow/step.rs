use super::context::WorkflowContext;
use async_trait::async_trait;
use autobake_core::{Error, Result};
use std::fmt;

/// Work performed by one workflow step
#[async_trait]
pub trait StepAction: Send + Sync {
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()>;
}

/// A named action plus its failure policy
pub struct WorkflowStep {
    pub(crate) name: String,
    pub(crate) continue_on_error: bool,
    pub(crate) action: Box<dyn StepAction>,
}

impl WorkflowStep {
    pub fn new(
        name: impl Into<String>,
        continue_on_error: bool,
        action: impl StepAction + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            continue_on_error,
            action: Box::new(action),
        }
    }

    /// A step whose failure aborts the workflow
    pub fn mandatory(name: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self::new(name, false, action)
    }

    /// A step whose failure is recorded but does not stop the workflow
    pub fn advisory(name: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self::new(name, true, action)
    }

    /// Override the step's failure policy
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Rename the step, e.g. to run a built-in step twice
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_mandatory(&self) -> bool {
        !self.continue_on_error
    }
}

impl fmt::Debug for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowStep")
            .field("name", &self.name)
            .field("continue_on_error", &self.continue_on_error)
            .finish_non_exhaustive()
    }
}

/// Step backed by a synchronous closure
///
/// Closure errors are reported as [`Error::Step`] with the closure's error as
/// the source.
pub struct FnStep<F> {
    name: String,
    f: F,
}

impl<F> FnStep<F>
where
    F: Fn(&mut WorkflowContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    pub fn mandatory(name: impl Into<String>, f: F) -> WorkflowStep {
        let name = name.into();
        WorkflowStep::mandatory(name.clone(), Self::new(name, f))
    }

    pub fn advisory(name: impl Into<String>, f: F) -> WorkflowStep {
        let name = name.into();
        WorkflowStep::advisory(name.clone(), Self::new(name, f))
    }
}

#[async_trait]
impl<F> StepAction for FnStep<F>
where
    F: Fn(&mut WorkflowContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        (self.f)(ctx).map_err(|e| Error::step_with_source(&self.name, e))
    }
}
