//! Contracts for the external systems autobake drives.
//!
//! Recipe execution, metadata lookups, repository management, notification
//! delivery and report storage all live outside the core. Each is reached
//! through one of the traits below so the engines can be exercised with
//! in-memory doubles (see [`crate::testing`]).

use crate::errors::Result;
use crate::types::{RecipeIdentifier, RecipeMetadata, RunSummary};
use async_trait::async_trait;
use std::path::Path;

/// Runs a single recipe through the packaging tool
#[async_trait]
pub trait RecipeExecutor: Send + Sync {
    /// Execute one recipe and return its combined output.
    ///
    /// Failures should be reported as [`crate::Error::TaskExecution`] so the
    /// captured output and exit code survive into the batch result.
    async fn execute(
        &self,
        identifier: &RecipeIdentifier,
        overrides_dir: Option<&Path>,
        verbose_level: u8,
    ) -> Result<String>;
}

/// Resolves a recipe's declared parent and owning repository
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn lookup(
        &self,
        identifier: &RecipeIdentifier,
        use_auth_token: bool,
    ) -> Result<RecipeMetadata>;
}

/// Membership and registration of recipe repositories
#[async_trait]
pub trait RepositoryRegistry: Send + Sync {
    async fn repository_exists(&self, repo_url: &str) -> bool;

    async fn add_repository(&self, repo_url: &str) -> Result<()>;
}

/// Posts a run summary to an operator channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, webhook_url: &str, summary: &RunSummary) -> Result<()>;
}

/// Stores machine-readable run reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn persist(&self, path: &Path, report: &serde_json::Value) -> Result<()>;
}

/// The packaging tool installation on this host
#[async_trait]
pub trait PackagingTool: Send + Sync {
    async fn is_installed(&self) -> bool;

    async fn install(&self) -> Result<()>;
}

/// Confirms a recipe's declared inputs still match its trusted baseline
#[async_trait]
pub trait TrustVerifier: Send + Sync {
    async fn verify(&self, identifier: &RecipeIdentifier) -> Result<()>;
}

/// Notifier used when no operator channel is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, webhook_url: &str, summary: &RunSummary) -> Result<()> {
        tracing::debug!(
            webhook = %webhook_url,
            headline = %summary.headline(),
            "notification skipped"
        );
        Ok(())
    }
}

/// Verifier that trusts every recipe
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustAll;

#[async_trait]
impl TrustVerifier for TrustAll {
    async fn verify(&self, _identifier: &RecipeIdentifier) -> Result<()> {
        Ok(())
    }
}
