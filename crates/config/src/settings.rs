//! Run-wide settings shared by every workflow step

use crate::options::{BatchOptions, ResolveOptions};
use autobake_core::{Error, Result, DEFAULT_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global configuration for one workflow run.
///
/// Steps read their defaults from here; nothing in the runner consults
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Name used in reports and notifications
    pub title: String,
    /// Packaging tool preferences file
    pub prefs_path: Option<PathBuf>,
    /// Worker count for batch runs
    pub default_concurrency: usize,
    /// Wall-clock budget for batch runs
    #[serde(with = "crate::duration_secs", rename = "default_timeout_secs")]
    pub default_timeout: Option<Duration>,
    pub stop_on_first_error: bool,
    /// Where JSON reports are written
    pub report_path: Option<PathBuf>,
    /// Operator channel for run summaries
    pub webhook_url: Option<String>,
    pub verbose_level: u8,
    /// Recipe overrides directory handed to every run
    pub overrides_dir: Option<PathBuf>,
    /// Scratch directory removed by the cleanup step
    pub cache_dir: Option<PathBuf>,
    pub resolve: ResolveOptions,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            title: "autobake run".to_string(),
            prefs_path: None,
            default_concurrency: DEFAULT_CONCURRENCY,
            default_timeout: None,
            stop_on_first_error: false,
            report_path: None,
            webhook_url: None,
            verbose_level: 0,
            overrides_dir: None,
            cache_dir: None,
            resolve: ResolveOptions::default(),
        }
    }
}

impl WorkflowSettings {
    /// Batch options derived from the run defaults
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            max_concurrency: self.default_concurrency,
            stop_on_first_error: self.stop_on_first_error,
            timeout: self.default_timeout,
            verbose_level: self.verbose_level,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_concurrency == 0 {
            return Err(Error::configuration(
                "default_concurrency must be at least 1",
            ));
        }
        if let Some(url) = &self.webhook_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(Error::configuration(format!(
                    "webhook_url '{url}' must be an http(s) URL"
                )));
            }
        }
        self.batch_options().validate()?;
        self.resolve.validate()
    }
}

/// Builder for creating workflow settings
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: WorkflowSettings,
}

impl SettingsBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from already loaded settings
    pub fn from_settings(settings: WorkflowSettings) -> Self {
        Self { settings }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.settings.title = title.into();
        self
    }

    pub fn prefs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.prefs_path = Some(path.into());
        self
    }

    pub fn default_concurrency(mut self, concurrency: usize) -> Self {
        self.settings.default_concurrency = concurrency;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.settings.default_timeout = Some(timeout);
        self
    }

    pub fn stop_on_first_error(mut self, stop: bool) -> Self {
        self.settings.stop_on_first_error = stop;
        self
    }

    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.report_path = Some(path.into());
        self
    }

    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.settings.webhook_url = Some(url.into());
        self
    }

    pub fn verbose_level(mut self, level: u8) -> Self {
        self.settings.verbose_level = level;
        self
    }

    pub fn overrides_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.overrides_dir = Some(path.into());
        self
    }

    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.cache_dir = Some(path.into());
        self
    }

    pub fn resolve(mut self, resolve: ResolveOptions) -> Self {
        self.settings.resolve = resolve;
        self
    }

    /// Validate and return the settings
    pub fn build(self) -> Result<WorkflowSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
