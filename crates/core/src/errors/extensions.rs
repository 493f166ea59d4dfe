//! Extension traits for error handling

use super::types::{Error, Result};

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a lazy message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", message.into(), base_error),
            }
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", f(), base_error),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_prefixes_message() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = result.context("loading recipe list").unwrap_err();
        assert!(err.to_string().contains("loading recipe list"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_task_error_display_includes_exit_code() {
        let err = Error::task_execution("Firefox.install.recipe", "download failed", Some(2));
        assert_eq!(
            err.to_string(),
            "recipe 'Firefox.install.recipe' failed with exit code 2: download failed"
        );
        assert!(err.is_task_level());
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn test_step_with_source_keeps_message() {
        let inner = Error::environment("autopkg is not installed");
        let err = Error::step_with_source("check", inner);
        assert_eq!(
            err.to_string(),
            "step 'check' failed: environment check failed: autopkg is not installed"
        );
    }
}
