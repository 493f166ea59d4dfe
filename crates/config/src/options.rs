//! Per-call options for the resolver and the batch engine

use autobake_core::{Error, Result, DEFAULT_CONCURRENCY, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How far and how carefully a recipe's inheritance chain is walked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Follow parent recipes at all
    pub include_parents: bool,
    /// Deepest ancestor level to visit; the root is depth 0
    pub max_depth: usize,
    /// Check each discovered repository against the registry
    pub verify_repo_exists: bool,
    /// Always require the base recipe repository
    pub include_base: bool,
    /// Pass the authenticated flag through to metadata lookups
    pub use_auth_token: bool,
    /// Roots resolved at the same time by `resolve_many`
    pub max_concurrency: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            include_parents: true,
            max_depth: DEFAULT_MAX_DEPTH,
            verify_repo_exists: false,
            include_base: false,
            use_auth_token: false,
            max_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ResolveOptions {
    pub fn with_include_parents(mut self, include: bool) -> Self {
        self.include_parents = include;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_verify_repo_exists(mut self, verify: bool) -> Self {
        self.verify_repo_exists = verify;
        self
    }

    pub fn with_include_base(mut self, include: bool) -> Self {
        self.include_base = include;
        self
    }

    pub fn with_auth_token(mut self, use_token: bool) -> Self {
        self.use_auth_token = use_token;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::configuration(
                "resolve.max_concurrency must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Concurrency and failure policy for one batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Number of workers pulling from the task queue
    pub max_concurrency: usize,
    /// Stop dequeuing new tasks once any task fails
    pub stop_on_first_error: bool,
    /// Wall-clock budget for the whole batch
    #[serde(with = "crate::duration_secs", rename = "timeout_secs")]
    pub timeout: Option<Duration>,
    /// Verbosity passed to tasks that do not set their own
    pub verbose_level: u8,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_CONCURRENCY,
            stop_on_first_error: false,
            timeout: None,
            verbose_level: 0,
        }
    }
}

impl BatchOptions {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_stop_on_first_error(mut self, stop: bool) -> Self {
        self.stop_on_first_error = stop;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_verbose_level(mut self, level: u8) -> Self {
        self.verbose_level = level;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::engine("max_concurrency must be at least 1"));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::configuration("batch timeout must be non-zero"));
        }
        Ok(())
    }
}
