//! In-memory collaborators for exercising the engines without a packaging
//! tool, network or repository checkout.

use crate::collaborators::{
    MetadataSource, Notifier, PackagingTool, RecipeExecutor, ReportSink, RepositoryRegistry,
    TrustVerifier,
};
use crate::errors::{Error, Result};
use crate::types::{RecipeIdentifier, RecipeMetadata, RunSummary};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

fn normalize(raw: &str) -> String {
    RecipeIdentifier::new(raw)
        .map(RecipeIdentifier::into_string)
        .unwrap_or_else(|_| raw.to_string())
}

enum MetadataEntry {
    Found(RecipeMetadata),
    Failing(String),
}

/// Metadata source backed by a fixed table of recipes
#[derive(Default)]
pub struct StaticMetadataSource {
    entries: HashMap<String, MetadataEntry>,
    lookups: Mutex<Vec<(String, bool)>>,
}

impl StaticMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe, optionally inheriting from `parent`
    pub fn with_recipe(mut self, identifier: &str, repo_url: &str, parent: Option<&str>) -> Self {
        let parent = parent.and_then(|p| RecipeIdentifier::new(p).ok());
        let metadata = RecipeMetadata {
            repo_url: repo_url.to_string(),
            parent,
        };
        self.entries
            .insert(normalize(identifier), MetadataEntry::Found(metadata));
        self
    }

    /// Make lookups of `identifier` fail
    pub fn with_failure(mut self, identifier: &str, message: &str) -> Self {
        self.entries.insert(
            normalize(identifier),
            MetadataEntry::Failing(message.to_string()),
        );
        self
    }

    /// Identifiers looked up so far, with the auth flag they were looked up with
    pub fn lookups(&self) -> Vec<(String, bool)> {
        self.lookups.lock().clone()
    }
}

#[async_trait]
impl MetadataSource for StaticMetadataSource {
    async fn lookup(
        &self,
        identifier: &RecipeIdentifier,
        use_auth_token: bool,
    ) -> Result<RecipeMetadata> {
        self.lookups
            .lock()
            .push((identifier.to_string(), use_auth_token));
        match self.entries.get(identifier.as_str()) {
            Some(MetadataEntry::Found(metadata)) => Ok(metadata.clone()),
            Some(MetadataEntry::Failing(message)) => {
                Err(Error::resolution(identifier.as_str(), message.clone()))
            }
            None => Err(Error::resolution(
                identifier.as_str(),
                "recipe not found in any known repository",
            )),
        }
    }
}

/// Recipe executor that succeeds unless told otherwise
#[derive(Default)]
pub struct ScriptedExecutor {
    failures: HashMap<String, Option<i32>>,
    panics: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    executed: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `identifier` fail with the given exit code
    pub fn fail(mut self, identifier: &str, exit_code: Option<i32>) -> Self {
        self.failures.insert(normalize(identifier), exit_code);
        self
    }

    /// Make `identifier` panic inside `execute`
    pub fn panic_on(mut self, identifier: &str) -> Self {
        self.panics.insert(normalize(identifier));
        self
    }

    /// Delay applied to every recipe without its own delay
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_delay(mut self, identifier: &str, delay: Duration) -> Self {
        self.delays.insert(normalize(identifier), delay);
        self
    }

    /// Identifiers in the order their execution started
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    /// Highest number of recipes observed running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        identifier: &RecipeIdentifier,
        _overrides_dir: Option<&Path>,
        verbose_level: u8,
    ) -> Result<String> {
        self.executed.lock().push(identifier.to_string());
        if self.panics.contains(identifier.as_str()) {
            panic!("executor blew up on {identifier}");
        }
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self
            .delays
            .get(identifier.as_str())
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let output = format!("Processing {identifier} (verbosity {verbose_level})");
        match self.failures.get(identifier.as_str()) {
            Some(exit_code) => Err(Error::task_execution_with_output(
                identifier.as_str(),
                "recipe processing failed",
                *exit_code,
                output,
            )),
            None => Ok(output),
        }
    }
}

/// Repository registry holding a fixed set of known repositories
#[derive(Default)]
pub struct StaticRepositoryRegistry {
    known: Mutex<HashSet<String>>,
    rejected: HashSet<String>,
    added: Mutex<Vec<String>>,
}

impl StaticRepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(self, repo_url: &str) -> Self {
        self.known.lock().insert(repo_url.to_string());
        self
    }

    /// Make `add_repository` fail for `repo_url`
    pub fn rejecting(mut self, repo_url: &str) -> Self {
        self.rejected.insert(repo_url.to_string());
        self
    }

    /// Repositories added through the registry, in order
    pub fn added(&self) -> Vec<String> {
        self.added.lock().clone()
    }
}

#[async_trait]
impl RepositoryRegistry for StaticRepositoryRegistry {
    async fn repository_exists(&self, repo_url: &str) -> bool {
        self.known.lock().contains(repo_url)
    }

    async fn add_repository(&self, repo_url: &str) -> Result<()> {
        if self.rejected.contains(repo_url) {
            return Err(Error::repository(repo_url, "clone failed"));
        }
        self.known.lock().insert(repo_url.to_string());
        self.added.lock().push(repo_url.to_string());
        Ok(())
    }
}

/// Notifier that remembers every summary it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, RunSummary)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, RunSummary)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, webhook_url: &str, summary: &RunSummary) -> Result<()> {
        if self.fail {
            return Err(Error::notification(webhook_url, "webhook returned 500"));
        }
        self.sent
            .lock()
            .push((webhook_url.to_string(), summary.clone()));
        Ok(())
    }
}

/// Report sink that keeps reports in memory
#[derive(Default)]
pub struct MemoryReportSink {
    reports: Mutex<Vec<(PathBuf, serde_json::Value)>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(PathBuf, serde_json::Value)> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn persist(&self, path: &Path, report: &serde_json::Value) -> Result<()> {
        self.reports
            .lock()
            .push((path.to_path_buf(), report.clone()));
        Ok(())
    }
}

/// Packaging tool whose installation state is a flag
#[derive(Default)]
pub struct StubPackagingTool {
    installed: AtomicBool,
    install_fails: bool,
    install_calls: AtomicUsize,
}

impl StubPackagingTool {
    pub fn installed() -> Self {
        Self {
            installed: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    /// A missing tool whose installation fails
    pub fn broken() -> Self {
        Self {
            install_fails: true,
            ..Self::default()
        }
    }

    pub fn install_calls(&self) -> usize {
        self.install_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackagingTool for StubPackagingTool {
    async fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    async fn install(&self) -> Result<()> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        if self.install_fails {
            return Err(Error::environment("installer package could not be downloaded"));
        }
        self.installed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Trust verifier that rejects a fixed set of recipes
#[derive(Default)]
pub struct StaticTrustVerifier {
    untrusted: HashSet<String>,
}

impl StaticTrustVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn untrusted(mut self, identifier: &str) -> Self {
        self.untrusted.insert(normalize(identifier));
        self
    }
}

#[async_trait]
impl TrustVerifier for StaticTrustVerifier {
    async fn verify(&self, identifier: &RecipeIdentifier) -> Result<()> {
        if self.untrusted.contains(identifier.as_str()) {
            return Err(Error::verification(
                format!("parent recipe hash changed for {identifier}"),
                vec![identifier.to_string()],
            ));
        }
        Ok(())
    }
}
