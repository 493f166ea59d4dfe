//! Configuration for autobake runs
//!
//! Every engine takes an explicit configuration value instead of reading
//! process-wide state: [`ResolveOptions`] for the dependency resolver,
//! [`BatchOptions`] for the batch engine and [`WorkflowSettings`] for the
//! orchestrator. [`SettingsLoader`] layers defaults, a JSON config file and
//! `AUTOBAKE_*` environment variables.

pub mod loader;
pub mod options;
pub mod settings;

mod duration_secs;

pub use loader::*;
pub use options::*;
pub use settings::*;
