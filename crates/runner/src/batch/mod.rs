//! Concurrent recipe execution
//!
//! [`BatchEngine`] runs a list of [`BatchTask`]s through a fixed pool of
//! workers pulling from one shared queue. Recipe failures are captured per
//! task; only problems with the batch itself (validation, stop after a
//! failure, timeout, a crashed worker) surface as [`BatchOutcome::error`].

mod engine;
mod report;
mod result;
mod task;

pub use engine::BatchEngine;
pub use report::{BatchReport, RecipeReportEntry};
pub use result::{BatchOutcome, BatchResult, BatchResults, BatchSummary, ExecutionFailure};
pub use task::BatchTask;
