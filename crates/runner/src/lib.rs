//! Recipe dependency resolution, batch execution and workflow orchestration
//!
//! - [`resolver`] walks recipe inheritance chains and reports the
//!   repositories a set of recipes needs.
//! - [`batch`] runs recipes through a bounded worker pool.
//! - [`workflow`] strings setup, analysis, execution and reporting steps
//!   into one sequential run.

pub mod batch;
pub mod resolver;
pub mod workflow;

pub use batch::{
    BatchEngine, BatchOutcome, BatchReport, BatchResult, BatchResults, BatchSummary, BatchTask,
    ExecutionFailure,
};
pub use resolver::{
    required_repositories, AncestorWarning, DependencyGraph, DependencyResolver, RecipeNode,
    RecipeRequirement,
};
pub use workflow::{
    Collaborators, FnStep, StepAction, Workflow, WorkflowBuilder, WorkflowContext,
    WorkflowReport, WorkflowResult, WorkflowStatus, WorkflowStep,
};
