//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;

impl Error {
    /// Create an invalid identifier error
    #[must_use]
    pub fn invalid_identifier(value: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidIdentifier {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create a resolution error for a recipe whose metadata could not be found
    #[must_use]
    pub fn resolution(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Resolution {
            identifier: identifier.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a resolution error wrapping the collaborator's failure
    #[must_use]
    pub fn resolution_with_source(
        identifier: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Resolution {
            identifier: identifier.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a task execution error
    #[must_use]
    pub fn task_execution(
        identifier: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Error::TaskExecution {
            identifier: identifier.into(),
            message: message.into(),
            exit_code,
            output: String::new(),
        }
    }

    /// Create a task execution error carrying the output captured so far
    #[must_use]
    pub fn task_execution_with_output(
        identifier: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        Error::TaskExecution {
            identifier: identifier.into(),
            message: message.into(),
            exit_code,
            output: output.into(),
        }
    }

    /// Create a batch engine error
    #[must_use]
    pub fn engine(message: impl Into<String>) -> Self {
        Error::Engine {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a workflow step error
    #[must_use]
    pub fn step(step: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Step {
            step: step.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error as the failure of a workflow step
    #[must_use]
    pub fn step_with_source(
        step: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let source = source.into();
        Error::Step {
            step: step.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a repository error
    #[must_use]
    pub fn repository(repo_url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Repository {
            repo_url: repo_url.into(),
            message: message.into(),
        }
    }

    /// Create a verification error listing the recipes that failed
    #[must_use]
    pub fn verification(message: impl Into<String>, failed: Vec<String>) -> Self {
        Error::Verification {
            message: message.into(),
            failed,
        }
    }

    /// Create an environment check error
    #[must_use]
    pub fn environment(message: impl Into<String>) -> Self {
        Error::Environment {
            message: message.into(),
        }
    }

    /// Create a notification error
    #[must_use]
    pub fn notification(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Notification {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }
}
