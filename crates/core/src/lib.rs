//! Core domain types, errors and collaborator contracts for `autobake`.
//!
//! ## Key Components
//!
//! - **`errors`**: the primary `Error` enum and `Result` alias, covering every
//!   failure mode from a single recipe run up to a whole workflow step.
//! - **`types`**: `RecipeIdentifier` and the data exchanged with collaborators.
//! - **`collaborators`**: traits for the packaging tool, metadata lookups,
//!   repositories, notifications and report storage.
//! - **`testing`**: in-memory implementations of those traits.
//! - **`constants`**: shared names, environment variables and defaults.

pub mod collaborators;
pub mod constants;
pub mod errors;
pub mod testing;
pub mod types;

pub use self::{
    collaborators::*,
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
