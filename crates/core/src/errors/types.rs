//! Core error type definitions

use std::path::PathBuf;

/// Result type alias for autobake operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for autobake operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A recipe identifier failed validation
    #[error("invalid recipe identifier '{value}': {message}")]
    InvalidIdentifier { value: String, message: String },

    /// Metadata lookup for a root recipe failed
    #[error("failed to resolve recipe '{identifier}': {message}")]
    Resolution {
        identifier: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// One recipe's execution failed
    #[error("{}", format_task_error(.identifier, .message, .exit_code))]
    TaskExecution {
        identifier: String,
        message: String,
        exit_code: Option<i32>,
        /// Combined output captured before the failure
        output: String,
    },

    /// The batch engine itself faulted
    #[error("batch engine error: {message}")]
    Engine { message: String },

    /// Operation timeout errors
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },

    /// A workflow step failed
    #[error("step '{step}' failed: {message}")]
    Step {
        step: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Repository registration errors
    #[error("repository '{repo_url}' error: {message}")]
    Repository { repo_url: String, message: String },

    /// Trust verification failures
    #[error("trust verification failed: {message}")]
    Verification { message: String, failed: Vec<String> },

    /// Host environment is not ready for a run
    #[error("environment check failed: {message}")]
    Environment { message: String },

    /// Notification delivery errors
    #[error("notification to '{endpoint}' failed: {message}")]
    Notification { endpoint: String, message: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

fn format_task_error(identifier: &str, message: &str, exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("recipe '{identifier}' failed with exit code {code}: {message}"),
        None => format!("recipe '{identifier}' failed: {message}"),
    }
}

impl Error {
    /// Whether this error belongs to a single recipe rather than the whole run
    pub fn is_task_level(&self) -> bool {
        matches!(self, Error::TaskExecution { .. })
    }

    /// Exit code reported by the packaging tool, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::TaskExecution { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}
