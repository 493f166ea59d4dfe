//! Resolved recipe inheritance chains

use autobake_core::RecipeIdentifier;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fmt;

/// Non-fatal problem recorded on an ancestor while walking a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AncestorWarning {
    /// Metadata for this recipe could not be fetched
    LookupFailed { message: String },
    /// The recipe's repository is not registered
    UnverifiedRepository { repo_url: String },
}

impl fmt::Display for AncestorWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AncestorWarning::LookupFailed { message } => {
                write!(f, "metadata lookup failed: {message}")
            }
            AncestorWarning::UnverifiedRepository { repo_url } => {
                write!(f, "repository '{repo_url}' is not registered")
            }
        }
    }
}

/// One recipe's place in an inheritance chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeNode {
    identifier: RecipeIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<RecipeIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo_url: Option<String>,
    depth: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<AncestorWarning>,
}

impl RecipeNode {
    pub(crate) fn new(identifier: RecipeIdentifier, depth: usize) -> Self {
        Self {
            identifier,
            parent: None,
            repo_url: None,
            depth,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn set_metadata(&mut self, repo_url: String, parent: Option<RecipeIdentifier>) {
        self.repo_url = Some(repo_url);
        self.parent = parent;
    }

    pub(crate) fn warn(&mut self, warning: AncestorWarning) {
        self.warnings.push(warning);
    }

    pub fn identifier(&self) -> &RecipeIdentifier {
        &self.identifier
    }

    /// Parent declared by the recipe, whether or not it was walked
    pub fn parent(&self) -> Option<&RecipeIdentifier> {
        self.parent.as_ref()
    }

    /// `None` only when the lookup for this ancestor failed
    pub fn repo_url(&self) -> Option<&str> {
        self.repo_url.as_deref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn warnings(&self) -> &[AncestorWarning] {
        &self.warnings
    }
}

/// A recipe together with the repository it needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeRequirement {
    pub identifier: RecipeIdentifier,
    pub repo_url: String,
}

/// Recipes discovered from one root, in discovery order.
///
/// Nodes are stored in an arena keyed by identifier; a re-encountered
/// identifier is detected by lookup, so cyclic or diamond-shaped
/// inheritance never produces a duplicate node.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyGraph {
    nodes: IndexMap<RecipeIdentifier, RecipeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_repository: Option<String>,
}

impl DependencyGraph {
    /// Insert a node; returns false when the identifier is already present
    pub(crate) fn insert(&mut self, node: RecipeNode) -> bool {
        if self.nodes.contains_key(&node.identifier) {
            return false;
        }
        self.nodes.insert(node.identifier.clone(), node);
        true
    }

    pub(crate) fn set_base_repository(&mut self, repo_url: impl Into<String>) {
        self.base_repository = Some(repo_url.into());
    }

    /// The recipe the walk started from
    pub fn root(&self) -> Option<&RecipeNode> {
        self.nodes.first().map(|(_, node)| node)
    }

    pub fn get(&self, identifier: &RecipeIdentifier) -> Option<&RecipeNode> {
        self.nodes.get(identifier)
    }

    pub fn contains(&self, identifier: &RecipeIdentifier) -> bool {
        self.nodes.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in discovery order, root first
    pub fn nodes(&self) -> impl Iterator<Item = &RecipeNode> {
        self.nodes.values()
    }

    pub fn base_repository(&self) -> Option<&str> {
        self.base_repository.as_deref()
    }

    /// The root followed by each walked ancestor
    pub fn chain(&self) -> Vec<&RecipeNode> {
        let mut chain = Vec::new();
        let mut current = self.root();
        while let Some(node) = current {
            chain.push(node);
            current = node
                .parent
                .as_ref()
                .and_then(|parent| self.nodes.get(parent))
                .filter(|parent| parent.depth > node.depth);
        }
        chain
    }

    /// Unique repositories needed by this graph, base repository first
    pub fn repositories(&self) -> Vec<String> {
        let mut repos = IndexSet::new();
        if let Some(base) = &self.base_repository {
            repos.insert(base.clone());
        }
        for node in self.nodes.values() {
            if let Some(url) = &node.repo_url {
                repos.insert(url.clone());
            }
        }
        repos.into_iter().collect()
    }

    /// `{identifier, repo_url}` pairs for every node whose repository is known
    pub fn requirements(&self) -> Vec<RecipeRequirement> {
        self.nodes
            .values()
            .filter_map(|node| {
                node.repo_url.as_ref().map(|url| RecipeRequirement {
                    identifier: node.identifier.clone(),
                    repo_url: url.clone(),
                })
            })
            .collect()
    }

    /// Every warning in the graph with the node it belongs to
    pub fn warnings(&self) -> Vec<(&RecipeIdentifier, &AncestorWarning)> {
        self.nodes
            .values()
            .flat_map(|node| node.warnings.iter().map(move |w| (&node.identifier, w)))
            .collect()
    }

    pub fn has_warnings(&self) -> bool {
        self.nodes.values().any(|node| !node.warnings.is_empty())
    }
}
