use autobake_core::RecipeIdentifier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One recipe queued for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTask {
    pub identifier: RecipeIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides_dir: Option<PathBuf>,
    /// Zero defers to the batch-level verbosity
    #[serde(default)]
    pub verbose_level: u8,
}

impl BatchTask {
    pub fn new(identifier: RecipeIdentifier) -> Self {
        Self {
            identifier,
            overrides_dir: None,
            verbose_level: 0,
        }
    }

    pub fn with_overrides_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.overrides_dir = Some(dir.into());
        self
    }

    pub fn with_verbose_level(mut self, level: u8) -> Self {
        self.verbose_level = level;
        self
    }

    pub fn overrides_dir(&self) -> Option<&Path> {
        self.overrides_dir.as_deref()
    }

    /// Verbosity this task runs with under a batch default of `batch_level`
    pub fn effective_verbosity(&self, batch_level: u8) -> u8 {
        if self.verbose_level > 0 {
            self.verbose_level
        } else {
            batch_level
        }
    }
}

impl From<RecipeIdentifier> for BatchTask {
    fn from(identifier: RecipeIdentifier) -> Self {
        Self::new(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_verbosity_wins_when_set() {
        let id = RecipeIdentifier::new("Firefox.install").unwrap();
        let task = BatchTask::new(id.clone());
        assert_eq!(task.effective_verbosity(2), 2);

        let loud = BatchTask::new(id).with_verbose_level(3);
        assert_eq!(loud.effective_verbosity(1), 3);
        assert_eq!(loud.effective_verbosity(0), 3);
    }
}
