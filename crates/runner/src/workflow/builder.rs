use super::collaborators::Collaborators;
use super::step::WorkflowStep;
use super::steps::{
    AddRepositoriesStep, AnalyzeDependenciesStep, CleanupStep, EnvironmentCheckStep,
    InstallToolStep, NotifyStep, PersistReportStep, RunRecipesStep, VerifyTrustStep,
};
use super::Workflow;
use autobake_config::{ResolveOptions, SettingsBuilder, WorkflowSettings};
use autobake_core::{Error, RecipeIdentifier, Result};
use autobake_utils::load_recipe_list;
use indexmap::IndexSet;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fluent builder for a [`Workflow`]
pub struct WorkflowBuilder {
    collaborators: Collaborators,
    settings: SettingsBuilder,
    recipes: IndexSet<RecipeIdentifier>,
    steps: Vec<WorkflowStep>,
}

impl WorkflowBuilder {
    pub(crate) fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            settings: SettingsBuilder::new(),
            recipes: IndexSet::new(),
            steps: Vec::new(),
        }
    }

    /// Replace all settings, e.g. with ones from the settings loader
    pub fn settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = SettingsBuilder::from_settings(settings);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.settings = self.settings.title(title);
        self
    }

    pub fn prefs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings = self.settings.prefs_path(path);
        self
    }

    pub fn default_concurrency(mut self, concurrency: usize) -> Self {
        self.settings = self.settings.default_concurrency(concurrency);
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.settings = self.settings.default_timeout(timeout);
        self
    }

    pub fn stop_on_first_error(mut self, stop: bool) -> Self {
        self.settings = self.settings.stop_on_first_error(stop);
        self
    }

    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings = self.settings.report_path(path);
        self
    }

    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.settings = self.settings.webhook_url(url);
        self
    }

    pub fn verbose_level(mut self, level: u8) -> Self {
        self.settings = self.settings.verbose_level(level);
        self
    }

    pub fn overrides_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings = self.settings.overrides_dir(path);
        self
    }

    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings = self.settings.cache_dir(path);
        self
    }

    pub fn resolve_options(mut self, options: ResolveOptions) -> Self {
        self.settings = self.settings.resolve(options);
        self
    }

    /// Add recipes to run; repeats are ignored
    pub fn recipes(mut self, recipes: impl IntoIterator<Item = RecipeIdentifier>) -> Self {
        self.recipes.extend(recipes);
        self
    }

    /// Add the recipes listed in a recipe list file
    pub fn recipes_from_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let recipes = load_recipe_list(path)?;
        tracing::debug!(path = %path.display(), count = recipes.len(), "recipe list loaded");
        Ok(self.recipes(recipes))
    }

    /// Append a step; steps run in the order they are added
    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn check_environment(self) -> Self {
        self.step(EnvironmentCheckStep::step())
    }

    pub fn install_tool(self) -> Self {
        self.step(InstallToolStep::step())
    }

    pub fn analyze_dependencies(self) -> Self {
        self.step(AnalyzeDependenciesStep::step())
    }

    pub fn add_repositories(self) -> Self {
        self.step(AddRepositoriesStep::step())
    }

    pub fn verify_trust(self) -> Self {
        self.step(VerifyTrustStep::step())
    }

    pub fn run_recipes(self) -> Self {
        self.step(RunRecipesStep::step())
    }

    pub fn cleanup(self) -> Self {
        self.step(CleanupStep::step())
    }

    pub fn notify(self) -> Self {
        self.step(NotifyStep::step())
    }

    pub fn persist_report(self, path: impl Into<PathBuf>) -> Self {
        self.step(PersistReportStep::step(path))
    }

    /// Validate settings and step names
    pub fn build(self) -> Result<Workflow> {
        let settings = self.settings.build()?;
        ensure_unique_names(&self.steps)?;

        Ok(Workflow::new(
            settings,
            self.collaborators,
            self.recipes.into_iter().collect(),
            self.steps,
        ))
    }
}

fn ensure_unique_names(steps: &[WorkflowStep]) -> Result<()> {
    let mut names = HashSet::with_capacity(steps.len());
    for step in steps {
        if !names.insert(step.name()) {
            return Err(Error::configuration(format!(
                "duplicate workflow step '{}'",
                step.name()
            )));
        }
    }
    Ok(())
}
