//! Configuration loader with precedence: defaults, then the JSON config
//! file, then `AUTOBAKE_*` environment variables.

use crate::settings::WorkflowSettings;
use autobake_core::constants::{
    AUTOBAKE_CACHE_DIR_VAR, AUTOBAKE_CONCURRENCY_VAR, AUTOBAKE_CONFIG_VAR,
    AUTOBAKE_OVERRIDES_DIR_VAR, AUTOBAKE_PREFS_PATH_VAR, AUTOBAKE_REPORT_PATH_VAR,
    AUTOBAKE_STOP_ON_FIRST_ERROR_VAR, AUTOBAKE_TIMEOUT_VAR, AUTOBAKE_VERBOSE_VAR,
    AUTOBAKE_WEBHOOK_URL_VAR, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
};
use autobake_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default configuration
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variable
    EnvironmentVariable(String),
}

/// Settings together with every layer that contributed to them
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: WorkflowSettings,
    pub sources: Vec<ConfigSource>,
}

/// Configuration loader that handles precedence
#[derive(Debug, Default)]
pub struct SettingsLoader {
    config_file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this file instead of the default location
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Use these variables instead of the process environment
    pub fn env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Load configuration with full precedence handling
    pub fn load(self) -> Result<LoadedSettings> {
        let env = self
            .env
            .unwrap_or_else(|| std::env::vars().collect::<HashMap<_, _>>());

        let mut settings = WorkflowSettings::default();
        let mut sources = vec![ConfigSource::Default];

        let config_path = match self.config_file {
            Some(path) => Some(path),
            None => default_config_path(&env),
        };
        if let Some(path) = config_path {
            if let Some(file_settings) = load_from_config_file(&path)? {
                settings = file_settings;
                sources.push(ConfigSource::ConfigFile(path));
            }
        }

        for var in apply_env(&mut settings, &env)? {
            sources.push(ConfigSource::EnvironmentVariable(var));
        }

        settings.validate()?;
        tracing::debug!(sources = ?sources, "settings loaded");

        Ok(LoadedSettings { settings, sources })
    }
}

/// `$AUTOBAKE_CONFIG`, falling back to the platform config directory
fn default_config_path(env: &HashMap<String, String>) -> Option<PathBuf> {
    if let Some(path) = env.get(AUTOBAKE_CONFIG_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn load_from_config_file(path: &Path) -> Result<Option<WorkflowSettings>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_system(path, "read config file", e))?;
    let settings = serde_json::from_str(&content).map_err(|e| {
        Error::configuration(format!(
            "invalid config file '{}': {e}",
            path.display()
        ))
    })?;
    Ok(Some(settings))
}

/// Apply environment overrides, returning the variables that were used
fn apply_env(
    settings: &mut WorkflowSettings,
    env: &HashMap<String, String>,
) -> Result<Vec<String>> {
    let mut applied = Vec::new();

    if let Some(value) = env.get(AUTOBAKE_CONCURRENCY_VAR) {
        settings.default_concurrency = parse_number(AUTOBAKE_CONCURRENCY_VAR, value)?;
        applied.push(AUTOBAKE_CONCURRENCY_VAR.to_string());
    }

    if let Some(value) = env.get(AUTOBAKE_TIMEOUT_VAR) {
        let secs: u64 = parse_number(AUTOBAKE_TIMEOUT_VAR, value)?;
        settings.default_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        applied.push(AUTOBAKE_TIMEOUT_VAR.to_string());
    }

    if let Some(value) = env.get(AUTOBAKE_STOP_ON_FIRST_ERROR_VAR) {
        settings.stop_on_first_error = parse_flag(AUTOBAKE_STOP_ON_FIRST_ERROR_VAR, value)?;
        applied.push(AUTOBAKE_STOP_ON_FIRST_ERROR_VAR.to_string());
    }

    if let Some(value) = env.get(AUTOBAKE_VERBOSE_VAR) {
        settings.verbose_level = parse_number(AUTOBAKE_VERBOSE_VAR, value)?;
        applied.push(AUTOBAKE_VERBOSE_VAR.to_string());
    }

    if let Some(value) = env.get(AUTOBAKE_WEBHOOK_URL_VAR) {
        settings.webhook_url = non_empty(value).map(str::to_string);
        applied.push(AUTOBAKE_WEBHOOK_URL_VAR.to_string());
    }

    let path_vars: [(&str, &mut Option<PathBuf>); 4] = [
        (AUTOBAKE_REPORT_PATH_VAR, &mut settings.report_path),
        (AUTOBAKE_PREFS_PATH_VAR, &mut settings.prefs_path),
        (AUTOBAKE_CACHE_DIR_VAR, &mut settings.cache_dir),
        (AUTOBAKE_OVERRIDES_DIR_VAR, &mut settings.overrides_dir),
    ];
    for (var, slot) in path_vars {
        if let Some(value) = env.get(var) {
            *slot = non_empty(value).map(PathBuf::from);
            applied.push(var.to_string());
        }
    }

    Ok(applied)
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_number<T: std::str::FromStr>(var: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        Error::configuration(format!("{var} must be a non-negative number, got '{value}'"))
    })
}

fn parse_flag(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::configuration(format!(
            "{var} must be a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_nothing_configured() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = SettingsLoader::new()
            .config_file(temp_dir.path().join("missing.json"))
            .env(HashMap::new())
            .load()
            .unwrap();

        assert_eq!(loaded.settings, WorkflowSettings::default());
        assert_eq!(loaded.sources, vec![ConfigSource::Default]);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(
            &config_path,
            r#"{"default_concurrency": 2, "stop_on_first_error": true, "title": "nightly"}"#,
        )
        .unwrap();

        let loaded = SettingsLoader::new()
            .config_file(&config_path)
            .env(env(&[
                (AUTOBAKE_CONCURRENCY_VAR, "8"),
                (AUTOBAKE_TIMEOUT_VAR, "120"),
                (AUTOBAKE_REPORT_PATH_VAR, "/tmp/report.json"),
            ]))
            .load()
            .unwrap();

        let settings = loaded.settings;
        assert_eq!(settings.title, "nightly");
        assert_eq!(settings.default_concurrency, 8);
        assert!(settings.stop_on_first_error);
        assert_eq!(settings.default_timeout, Some(Duration::from_secs(120)));
        assert_eq!(settings.report_path, Some(PathBuf::from("/tmp/report.json")));
        assert!(loaded
            .sources
            .contains(&ConfigSource::ConfigFile(config_path.clone())));
        assert!(loaded.sources.contains(&ConfigSource::EnvironmentVariable(
            AUTOBAKE_CONCURRENCY_VAR.to_string()
        )));
    }

    #[test]
    fn test_config_path_from_env_var() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("autobake.json");
        fs::write(&config_path, r#"{"verbose_level": 3}"#).unwrap();

        let loaded = SettingsLoader::new()
            .env(env(&[(AUTOBAKE_CONFIG_VAR, config_path.to_str().unwrap())]))
            .load()
            .unwrap();
        assert_eq!(loaded.settings.verbose_level, 3);
    }

    #[test]
    fn test_invalid_env_values_fail() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("none.json");

        let err = SettingsLoader::new()
            .config_file(&missing)
            .env(env(&[(AUTOBAKE_STOP_ON_FIRST_ERROR_VAR, "maybe")]))
            .load()
            .unwrap_err();
        assert!(err.to_string().contains(AUTOBAKE_STOP_ON_FIRST_ERROR_VAR));

        let err = SettingsLoader::new()
            .config_file(&missing)
            .env(env(&[(AUTOBAKE_CONCURRENCY_VAR, "0")]))
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("default_concurrency"));
    }

    #[test]
    fn test_malformed_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{ not json").unwrap();

        let err = SettingsLoader::new()
            .config_file(&config_path)
            .env(HashMap::new())
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
