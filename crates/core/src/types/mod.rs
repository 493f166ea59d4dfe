//! Domain types shared across the autobake crates

pub mod identifier;
pub mod metadata;

pub use identifier::RecipeIdentifier;
pub use metadata::{RecipeMetadata, RunSummary};
