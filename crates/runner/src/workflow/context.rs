//! Mutable state shared by the steps of one workflow run

use super::collaborators::Collaborators;
use super::state::{WorkflowState, WorkflowStatus};
use crate::batch::{BatchOutcome, BatchSummary};
use crate::resolver::DependencyGraph;
use autobake_config::WorkflowSettings;
use autobake_core::{RecipeIdentifier, RunSummary};
use indexmap::{IndexMap, IndexSet};

/// Handed to each step in turn; steps never run concurrently
pub struct WorkflowContext {
    settings: WorkflowSettings,
    collaborators: Collaborators,
    recipes: Vec<RecipeIdentifier>,
    graphs: IndexMap<RecipeIdentifier, DependencyGraph>,
    required_repositories: IndexSet<String>,
    batch_summary: Option<BatchSummary>,
    failed_recipes: Vec<RecipeIdentifier>,
    pub(crate) state: WorkflowState,
}

impl WorkflowContext {
    pub(crate) fn new(
        settings: WorkflowSettings,
        collaborators: Collaborators,
        recipes: Vec<RecipeIdentifier>,
    ) -> Self {
        Self {
            settings,
            collaborators,
            recipes,
            graphs: IndexMap::new(),
            required_repositories: IndexSet::new(),
            batch_summary: None,
            failed_recipes: Vec::new(),
            state: WorkflowState::new(),
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Recipes still scheduled to run
    pub fn recipes(&self) -> &[RecipeIdentifier] {
        &self.recipes
    }

    /// Drop recipes from the run list
    pub fn retain_recipes(&mut self, mut keep: impl FnMut(&RecipeIdentifier) -> bool) {
        self.recipes.retain(|recipe| keep(recipe));
    }

    pub fn graphs(&self) -> &IndexMap<RecipeIdentifier, DependencyGraph> {
        &self.graphs
    }

    pub fn record_graph(&mut self, root: RecipeIdentifier, graph: DependencyGraph) {
        self.required_repositories.extend(graph.repositories());
        self.graphs.insert(root, graph);
    }

    /// Repositories discovered so far, in first-seen order
    pub fn required_repositories(&self) -> Vec<String> {
        self.required_repositories.iter().cloned().collect()
    }

    pub fn batch_summary(&self) -> Option<&BatchSummary> {
        self.batch_summary.as_ref()
    }

    /// Take the counts and failures of a finished batch
    pub fn record_batch(&mut self, outcome: &BatchOutcome) {
        self.batch_summary = Some(outcome.summary);
        for result in outcome.results.iter() {
            self.record_processed(result.identifier.clone());
        }
        self.failed_recipes = outcome.results.failed().into_iter().cloned().collect();
    }

    pub fn record_processed(&mut self, recipe: RecipeIdentifier) {
        self.state.processed_recipes.insert(recipe);
    }

    pub fn processed_recipes(&self) -> impl Iterator<Item = &RecipeIdentifier> {
        self.state.processed_recipes.iter()
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn status(&self) -> WorkflowStatus {
        self.state.status
    }

    /// Digest of the run so far for notification channels
    pub fn run_summary(&self) -> RunSummary {
        let (succeeded, failed) = self
            .batch_summary
            .map(|s| (s.succeeded, s.failed))
            .unwrap_or_default();
        RunSummary {
            title: self.settings.title.clone(),
            success: self.state.failed_steps.is_empty() && self.failed_recipes.is_empty(),
            succeeded,
            failed,
            failed_recipes: self.failed_recipes.iter().map(ToString::to_string).collect(),
            failed_steps: self.state.failed_steps.clone(),
        }
    }
}
