//! Data exchanged with external collaborators

use super::identifier::RecipeIdentifier;
use serde::{Deserialize, Serialize};

/// What a metadata source knows about a single recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeMetadata {
    /// Repository the recipe lives in
    pub repo_url: String,
    /// Recipe this one inherits from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RecipeIdentifier>,
}

impl RecipeMetadata {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: RecipeIdentifier) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Operator-facing digest of a run, posted to notification channels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub title: String,
    pub success: bool,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_recipes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_steps: Vec<String>,
}

impl RunSummary {
    /// Single-line rendering for chat-style channels
    pub fn headline(&self) -> String {
        let status = if self.success { "succeeded" } else { "failed" };
        let mut line = format!(
            "{}: {} ({} ok, {} failed)",
            self.title, status, self.succeeded, self.failed
        );
        if !self.failed_recipes.is_empty() {
            line.push_str(&format!(" - failing recipes: {}", self.failed_recipes.join(", ")));
        }
        if !self.failed_steps.is_empty() {
            line.push_str(&format!(" - failing steps: {}", self.failed_steps.join(", ")));
        }
        line
    }
}
