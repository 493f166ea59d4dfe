//! Recipe dependency resolution
//!
//! Walks a recipe's parent chain breadth-first, asking the metadata source
//! for each recipe's repository and declared parent. The root recipe must
//! resolve; ancestors are best effort and failures are recorded on the node
//! as [`AncestorWarning`]s.

mod graph;

pub use graph::{AncestorWarning, DependencyGraph, RecipeNode, RecipeRequirement};

use autobake_config::ResolveOptions;
use autobake_core::{
    Error, MetadataSource, RecipeIdentifier, RepositoryRegistry, Result, BASE_REPOSITORY,
};
use autobake_utils::tracing::resolve_span;
use futures::stream::{self, StreamExt};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::Instrument;

/// Discovers the repositories a recipe needs by walking its parents
#[derive(Clone)]
pub struct DependencyResolver {
    metadata: Arc<dyn MetadataSource>,
    repositories: Arc<dyn RepositoryRegistry>,
}

impl DependencyResolver {
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        repositories: Arc<dyn RepositoryRegistry>,
    ) -> Self {
        Self {
            metadata,
            repositories,
        }
    }

    /// Resolve one root recipe into its dependency graph
    pub async fn resolve(
        &self,
        root: &RecipeIdentifier,
        options: &ResolveOptions,
    ) -> Result<DependencyGraph> {
        self.walk(root, options)
            .instrument(resolve_span(root.as_str()))
            .await
    }

    async fn walk(
        &self,
        root: &RecipeIdentifier,
        options: &ResolveOptions,
    ) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::default();
        if options.include_base {
            graph.set_base_repository(BASE_REPOSITORY);
        }

        // The root is mandatory; anything past it is best effort
        let root_metadata = self
            .metadata
            .lookup(root, options.use_auth_token)
            .await
            .map_err(|e| match e {
                Error::Resolution { .. } => e,
                other => Error::resolution_with_source(
                    root.as_str(),
                    "metadata lookup failed",
                    other,
                ),
            })?;

        let mut visited = HashSet::from([root.clone()]);
        let mut queue = VecDeque::from([(root.clone(), 0usize, Some(root_metadata))]);

        while let Some((identifier, depth, prefetched)) = queue.pop_front() {
            let lookup = match prefetched {
                Some(metadata) => Ok(metadata),
                None => {
                    self.metadata
                        .lookup(&identifier, options.use_auth_token)
                        .await
                }
            };

            let mut node = RecipeNode::new(identifier.clone(), depth);
            match lookup {
                Ok(metadata) => {
                    if options.verify_repo_exists
                        && !self.repositories.repository_exists(&metadata.repo_url).await
                    {
                        tracing::warn!(
                            recipe = %identifier,
                            repo = %metadata.repo_url,
                            "recipe repository is not registered"
                        );
                        node.warn(AncestorWarning::UnverifiedRepository {
                            repo_url: metadata.repo_url.clone(),
                        });
                    }

                    let parent = metadata.parent.as_ref().filter(|_| options.include_parents);
                    if let Some(parent) = parent {
                        if depth + 1 > options.max_depth {
                            tracing::debug!(
                                recipe = %identifier,
                                parent = %parent,
                                max_depth = options.max_depth,
                                "depth limit reached, parent not followed"
                            );
                        } else if !visited.insert(parent.clone()) {
                            tracing::debug!(
                                recipe = %identifier,
                                parent = %parent,
                                "parent already in chain, not revisited"
                            );
                        } else {
                            queue.push_back((parent.clone(), depth + 1, None));
                        }
                    }

                    node.set_metadata(metadata.repo_url, metadata.parent);
                }
                Err(e) => {
                    tracing::warn!(
                        recipe = %identifier,
                        depth,
                        error = %e,
                        "ancestor lookup failed"
                    );
                    node.warn(AncestorWarning::LookupFailed {
                        message: e.to_string(),
                    });
                }
            }

            graph.insert(node);
        }

        tracing::debug!(
            root = %root,
            nodes = graph.len(),
            warnings = graph.warnings().len(),
            "recipe chain resolved"
        );
        Ok(graph)
    }

    /// Resolve several roots independently.
    ///
    /// At most `options.max_concurrency` roots are resolved at once. The
    /// returned map follows the input order; duplicate roots resolve once.
    pub async fn resolve_many(
        &self,
        roots: &[RecipeIdentifier],
        options: &ResolveOptions,
    ) -> IndexMap<RecipeIdentifier, Result<DependencyGraph>> {
        let unique: IndexSet<RecipeIdentifier> = roots.iter().cloned().collect();
        let concurrency = options.max_concurrency.max(1);

        let mut resolved: HashMap<RecipeIdentifier, Result<DependencyGraph>> =
            stream::iter(unique.iter().cloned().map(|root| async move {
                let graph = self.resolve(&root, options).await;
                (root, graph)
            }))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        unique
            .into_iter()
            .filter_map(|root| resolved.remove(&root).map(|graph| (root, graph)))
            .collect()
    }
}

/// Union of the repositories needed by `graphs`, in first-seen order
pub fn required_repositories<'a>(
    graphs: impl IntoIterator<Item = &'a DependencyGraph>,
) -> Vec<String> {
    let mut repos = IndexSet::new();
    for graph in graphs {
        repos.extend(graph.repositories());
    }
    repos.into_iter().collect()
}
