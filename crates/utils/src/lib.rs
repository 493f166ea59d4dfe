//! Shared utilities for autobake
//!
//! Tracing setup and span helpers, atomic file writes, the JSON report sink
//! and recipe list parsing.

pub mod atomic_file;
pub mod recipe_list;
pub mod report;
pub mod tracing;

pub use atomic_file::*;
pub use recipe_list::*;
pub use report::*;
