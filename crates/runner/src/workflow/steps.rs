//! Built-in workflow steps

use super::context::WorkflowContext;
use super::report::WorkflowReport;
use super::step::{StepAction, WorkflowStep};
use crate::batch::{BatchEngine, BatchReport, BatchTask};
use crate::resolver::DependencyResolver;
use async_trait::async_trait;
use autobake_core::{Error, Result, ResultExt};
use std::path::PathBuf;
use std::sync::Arc;

/// Fails unless the packaging tool is present and the preferences file exists
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvironmentCheckStep;

impl EnvironmentCheckStep {
    pub const NAME: &'static str = "check_environment";

    pub fn step() -> WorkflowStep {
        WorkflowStep::mandatory(Self::NAME, Self)
    }
}

#[async_trait]
impl StepAction for EnvironmentCheckStep {
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        if !ctx.collaborators().packaging_tool.is_installed().await {
            return Err(Error::environment("packaging tool is not installed"));
        }

        if let Some(prefs) = &ctx.settings().prefs_path {
            let exists = tokio::fs::try_exists(prefs)
                .await
                .map_err(|e| Error::file_system(prefs, "check preferences file", e))?;
            if !exists {
                return Err(Error::environment(format!(
                    "preferences file {} does not exist",
                    prefs.display()
                )));
            }
        }

        tracing::debug!("environment check passed");
        Ok(())
    }
}

/// Installs the packaging tool when it is missing
#[derive(Debug, Default, Clone, Copy)]
pub struct InstallToolStep;

impl InstallToolStep {
    pub const NAME: &'static str = "install_tool";

    pub fn step() -> WorkflowStep {
        WorkflowStep::mandatory(Self::NAME, Self)
    }
}

#[async_trait]
impl StepAction for InstallToolStep {
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        let tool = &ctx.collaborators().packaging_tool;
        if tool.is_installed().await {
            tracing::debug!("packaging tool already installed");
            return Ok(());
        }

        tracing::info!("installing packaging tool");
        tool.install().await?;
        if !tool.is_installed().await {
            return Err(Error::environment(
                "packaging tool still missing after installation",
            ));
        }
        Ok(())
    }
}

/// Resolves every recipe's parent chain and records the repositories needed
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyzeDependenciesStep;

impl AnalyzeDependenciesStep {
    pub const NAME: &'static str = "analyze_dependencies";

    pub fn step() -> WorkflowStep {
        WorkflowStep::mandatory(Self::NAME, Self)
    }
}

#[async_trait]
impl StepAction for AnalyzeDependenciesStep {
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        let resolver = DependencyResolver::new(
            Arc::clone(&ctx.collaborators().metadata),
            Arc::clone(&ctx.collaborators().repositories),
        );
        let graphs = resolver
            .resolve_many(ctx.recipes(), &ctx.settings().resolve)
            .await;

        let mut unresolved = Vec::new();
        for (root, graph) in graphs {
            ctx.record_processed(root.clone());
            match graph {
                Ok(graph) => {
                    for (identifier, warning) in graph.warnings() {
                        tracing::warn!(
                            root = %root,
                            recipe = %identifier,
                            %warning,
                            "ancestor warning"
                        );
                    }
                    ctx.record_graph(root, graph);
                }
                Err(e) => {
                    tracing::error!(recipe = %root, error = %e, "recipe could not be resolved");
                    unresolved.push(root.to_string());
                }
            }
        }

        tracing::info!(
            resolved = ctx.graphs().len(),
            repositories = ctx.required_repositories().len(),
            "dependency analysis finished"
        );

        if !unresolved.is_empty() {
            return Err(Error::step(
                Self::NAME,
                format!("unresolved recipes: {}", unresolved.join(", ")),
            ));
        }
        Ok(())
    }
}

/// Registers every required repository that is not already known
#[derive(Debug, Default, Clone, Copy)]
pub struct AddRepositoriesStep;

impl AddRepositoriesStep {
    pub const NAME: &'static str = "add_repositories";

    pub fn step() -> WorkflowStep {
        WorkflowStep::mandatory(Self::NAME, Self)
    }
}

#[async_trait]
impl StepAction for AddRepositoriesStep {
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        let registry = &ctx.collaborators().repositories;
        let mut added = 0usize;
        for repo in ctx.required_repositories() {
            if registry.repository_exists(&repo).await {
                continue;
            }
            tracing::info!(repo = %repo, "adding repository");
            registry.add_repository(&repo).await?;
            added += 1;
        }
        tracing::debug!(added, "repositories up to date");
        Ok(())
    }
}

/// Drops recipes that fail trust verification from the run list
#[derive(Debug, Default, Clone, Copy)]
pub struct VerifyTrustStep;

impl VerifyTrustStep {
    pub const NAME: &'static str = "verify_trust";

    pub fn step() -> WorkflowStep {
        WorkflowStep::advisory(Self::NAME, Self)
    }
}

#[async_trait]
impl StepAction for VerifyTrustStep {
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        let verifier = Arc::clone(&ctx.collaborators().trust_verifier);
        let mut untrusted = Vec::new();
        let recipes = ctx.recipes().to_vec();
        for recipe in recipes {
            if let Err(e) = verifier.verify(&recipe).await {
                tracing::warn!(recipe = %recipe, error = %e, "trust verification failed");
                untrusted.push(recipe.clone());
            }
            ctx.record_processed(recipe);
        }

        if untrusted.is_empty() {
            return Ok(());
        }
        ctx.retain_recipes(|recipe| !untrusted.contains(recipe));
        Err(Error::verification(
            format!("{} recipe(s) failed trust verification", untrusted.len()),
            untrusted.iter().map(ToString::to_string).collect(),
        ))
    }
}

/// Runs the recipe list through the batch engine
#[derive(Debug, Default, Clone, Copy)]
pub struct RunRecipesStep;

impl RunRecipesStep {
    pub const NAME: &'static str = "run_recipes";

    pub fn step() -> WorkflowStep {
        WorkflowStep::mandatory(Self::NAME, Self)
    }
}

#[async_trait]
impl StepAction for RunRecipesStep {
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        let settings = ctx.settings();
        let tasks: Vec<BatchTask> = ctx
            .recipes()
            .iter()
            .map(|recipe| {
                let task = BatchTask::new(recipe.clone());
                match &settings.overrides_dir {
                    Some(dir) => task.with_overrides_dir(dir.clone()),
                    None => task,
                }
            })
            .collect();
        let options = settings.batch_options();
        let report_path = settings.report_path.clone();

        let engine = BatchEngine::new(Arc::clone(&ctx.collaborators().executor));
        let outcome = engine.run(tasks, &options).await;
        ctx.record_batch(&outcome);

        if let Some(path) = report_path {
            BatchReport::from_outcome(&outcome)
                .persist(ctx.collaborators().report_sink.as_ref(), &path)
                .await?;
        }

        if outcome.summary.failed > 0 {
            tracing::warn!(
                failed = outcome.summary.failed,
                succeeded = outcome.summary.succeeded,
                "some recipes failed"
            );
        }
        outcome.into_result().map(|_| ())
    }
}

/// Removes the configured cache directory
#[derive(Debug, Default, Clone, Copy)]
pub struct CleanupStep;

impl CleanupStep {
    pub const NAME: &'static str = "cleanup";

    pub fn step() -> WorkflowStep {
        WorkflowStep::advisory(Self::NAME, Self)
    }
}

#[async_trait]
impl StepAction for CleanupStep {
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        let Some(cache_dir) = &ctx.settings().cache_dir else {
            tracing::debug!("no cache directory configured");
            return Ok(());
        };

        match tokio::fs::remove_dir_all(cache_dir).await {
            Ok(()) => {
                tracing::info!(path = %cache_dir.display(), "cache directory removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::file_system(cache_dir, "remove cache directory", e)),
        }
    }
}

/// Posts the run summary to the configured webhook
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyStep;

impl NotifyStep {
    pub const NAME: &'static str = "notify";

    pub fn step() -> WorkflowStep {
        WorkflowStep::advisory(Self::NAME, Self)
    }
}

#[async_trait]
impl StepAction for NotifyStep {
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        let Some(webhook) = &ctx.settings().webhook_url else {
            tracing::debug!("no webhook configured, skipping notification");
            return Ok(());
        };
        let summary = ctx.run_summary();
        ctx.collaborators().notifier.notify(webhook, &summary).await?;
        tracing::info!(headline = %summary.headline(), "notification sent");
        Ok(())
    }
}

/// Writes a snapshot of the workflow so far
#[derive(Debug, Clone)]
pub struct PersistReportStep {
    path: PathBuf,
}

impl PersistReportStep {
    pub const NAME: &'static str = "persist_report";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn step(path: impl Into<PathBuf>) -> WorkflowStep {
        WorkflowStep::advisory(Self::NAME, Self::new(path))
    }
}

#[async_trait]
impl StepAction for PersistReportStep {
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        let report = WorkflowReport::snapshot(ctx);
        let value = serde_json::to_value(&report).context("serializing workflow report")?;
        ctx.collaborators()
            .report_sink
            .persist(&self.path, &value)
            .await?;
        tracing::info!(path = %self.path.display(), "workflow report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Collaborators;
    use autobake_config::WorkflowSettings;
    use autobake_core::testing::{
        MemoryReportSink, RecordingNotifier, ScriptedExecutor, StaticMetadataSource,
        StaticRepositoryRegistry, StaticTrustVerifier, StubPackagingTool,
    };
    use autobake_core::{PackagingTool, RecipeExecutor, RecipeIdentifier, RepositoryRegistry};

    const REPO: &str = "https://github.com/autopkg/recipes";

    fn id(name: &str) -> RecipeIdentifier {
        RecipeIdentifier::new(name).unwrap()
    }

    fn context(
        settings: WorkflowSettings,
        collaborators: Collaborators,
        recipes: &[&str],
    ) -> WorkflowContext {
        WorkflowContext::new(settings, collaborators, recipes.iter().map(|r| id(r)).collect())
    }

    fn collaborators_with(
        executor: Arc<dyn RecipeExecutor>,
        repositories: Arc<dyn RepositoryRegistry>,
        tool: Arc<dyn PackagingTool>,
    ) -> Collaborators {
        Collaborators::new(
            executor,
            Arc::new(StaticMetadataSource::new().with_recipe("Firefox.install", REPO, None)),
            repositories,
            tool,
        )
    }

    fn collaborators(tool: StubPackagingTool) -> Collaborators {
        collaborators_with(
            Arc::new(ScriptedExecutor::new()),
            Arc::new(StaticRepositoryRegistry::new()),
            Arc::new(tool),
        )
    }

    #[tokio::test]
    async fn test_environment_check_requires_tool_and_prefs() {
        let mut ctx = context(
            WorkflowSettings::default(),
            collaborators(StubPackagingTool::missing()),
            &[],
        );
        let err = EnvironmentCheckStep.execute(&mut ctx).await.unwrap_err();
        assert!(matches!(err, Error::Environment { .. }));

        let settings = WorkflowSettings {
            prefs_path: Some(PathBuf::from("/nonexistent/autobake/prefs.plist")),
            ..WorkflowSettings::default()
        };
        let mut ctx = context(settings, collaborators(StubPackagingTool::installed()), &[]);
        let err = EnvironmentCheckStep.execute(&mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("prefs.plist"));
    }

    #[tokio::test]
    async fn test_install_only_when_missing() {
        let tool = Arc::new(StubPackagingTool::missing());
        let collab = collaborators_with(
            Arc::new(ScriptedExecutor::new()),
            Arc::new(StaticRepositoryRegistry::new()),
            tool.clone(),
        );
        let mut ctx = context(WorkflowSettings::default(), collab, &[]);

        InstallToolStep.execute(&mut ctx).await.unwrap();
        InstallToolStep.execute(&mut ctx).await.unwrap();
        assert_eq!(tool.install_calls(), 1);
    }

    #[tokio::test]
    async fn test_analyze_then_add_repositories() {
        let registry = Arc::new(StaticRepositoryRegistry::new());
        let collab = collaborators_with(
            Arc::new(ScriptedExecutor::new()),
            registry.clone(),
            Arc::new(StubPackagingTool::installed()),
        );
        let mut ctx = context(WorkflowSettings::default(), collab, &["Firefox.install"]);

        AnalyzeDependenciesStep.execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.required_repositories(), vec![REPO]);

        AddRepositoriesStep.execute(&mut ctx).await.unwrap();
        AddRepositoriesStep.execute(&mut ctx).await.unwrap();
        assert_eq!(registry.added(), vec![REPO]);
    }

    #[tokio::test]
    async fn test_analyze_fails_on_unresolved_root() {
        let mut ctx = context(
            WorkflowSettings::default(),
            collaborators(StubPackagingTool::installed()),
            &["Firefox.install", "Missing.download"],
        );
        let err = AnalyzeDependenciesStep.execute(&mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("Missing.download.recipe"));
        // Resolved roots are still recorded
        assert!(ctx.graphs().contains_key(&id("Firefox.install")));
        let processed: Vec<&RecipeIdentifier> = ctx.processed_recipes().collect();
        assert_eq!(processed, vec![&id("Firefox.install"), &id("Missing.download")]);
    }

    #[tokio::test]
    async fn test_verify_trust_drops_untrusted_recipes() {
        let collab = collaborators(StubPackagingTool::installed())
            .with_trust_verifier(Arc::new(StaticTrustVerifier::new().untrusted("Zoom.pkg")));
        let mut ctx = context(
            WorkflowSettings::default(),
            collab,
            &["Firefox.install", "Zoom.pkg"],
        );

        let err = VerifyTrustStep.execute(&mut ctx).await.unwrap_err();
        match err {
            Error::Verification { failed, .. } => assert_eq!(failed, vec!["Zoom.pkg.recipe"]),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(ctx.recipes(), &[id("Firefox.install")]);
        // Dropped recipes were still checked
        assert_eq!(ctx.processed_recipes().count(), 2);
    }

    #[tokio::test]
    async fn test_run_recipes_persists_report_and_counts_failures() {
        let sink = Arc::new(MemoryReportSink::new());
        let collab = collaborators_with(
            Arc::new(ScriptedExecutor::new().fail("Zoom.pkg", Some(1))),
            Arc::new(StaticRepositoryRegistry::new()),
            Arc::new(StubPackagingTool::installed()),
        )
        .with_report_sink(sink.clone());
        let settings = WorkflowSettings {
            report_path: Some(PathBuf::from("/var/tmp/autobake-report.json")),
            ..WorkflowSettings::default()
        };
        let mut ctx = context(settings, collab, &["Firefox.install", "Zoom.pkg"]);

        // Recipe failures alone do not fail the step
        RunRecipesStep.execute(&mut ctx).await.unwrap();

        let summary = ctx.batch_summary().unwrap();
        assert_eq!((summary.succeeded, summary.failed), (1, 1));
        assert_eq!(ctx.processed_recipes().count(), 2);
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, PathBuf::from("/var/tmp/autobake-report.json"));

        let run = ctx.run_summary();
        assert!(!run.success);
        assert_eq!(run.failed_recipes, vec!["Zoom.pkg.recipe"]);
    }

    #[tokio::test]
    async fn test_cleanup_removes_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache");
        std::fs::create_dir_all(cache.join("downloads")).unwrap();
        let settings = WorkflowSettings {
            cache_dir: Some(cache.clone()),
            ..WorkflowSettings::default()
        };
        let mut ctx = context(settings, collaborators(StubPackagingTool::installed()), &[]);

        CleanupStep.execute(&mut ctx).await.unwrap();
        assert!(!cache.exists());
        // Already gone is fine
        CleanupStep.execute(&mut ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_notify_is_noop_without_webhook() {
        let notifier = Arc::new(RecordingNotifier::new());
        let collab = collaborators(StubPackagingTool::installed()).with_notifier(notifier.clone());
        let mut ctx = context(WorkflowSettings::default(), collab, &[]);
        NotifyStep.execute(&mut ctx).await.unwrap();
        assert!(notifier.sent().is_empty());
    }
}
