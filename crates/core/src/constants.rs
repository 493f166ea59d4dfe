/// Constants used throughout the autobake codebase
// Recipe naming
pub const RECIPE_SUFFIX: &str = ".recipe";

// Repository that every recipe chain ultimately relies on
pub const BASE_REPOSITORY: &str = "https://github.com/autopkg/recipes";

// Environment variable names
pub const AUTOBAKE_CONFIG_VAR: &str = "AUTOBAKE_CONFIG";
pub const AUTOBAKE_CONCURRENCY_VAR: &str = "AUTOBAKE_CONCURRENCY";
pub const AUTOBAKE_TIMEOUT_VAR: &str = "AUTOBAKE_TIMEOUT_SECS";
pub const AUTOBAKE_STOP_ON_FIRST_ERROR_VAR: &str = "AUTOBAKE_STOP_ON_FIRST_ERROR";
pub const AUTOBAKE_REPORT_PATH_VAR: &str = "AUTOBAKE_REPORT_PATH";
pub const AUTOBAKE_WEBHOOK_URL_VAR: &str = "AUTOBAKE_WEBHOOK_URL";
pub const AUTOBAKE_PREFS_PATH_VAR: &str = "AUTOBAKE_PREFS_PATH";
pub const AUTOBAKE_VERBOSE_VAR: &str = "AUTOBAKE_VERBOSE";
pub const AUTOBAKE_CACHE_DIR_VAR: &str = "AUTOBAKE_CACHE_DIR";
pub const AUTOBAKE_OVERRIDES_DIR_VAR: &str = "AUTOBAKE_OVERRIDES_DIR";

// Config file location relative to the platform config directory
pub const CONFIG_DIR_NAME: &str = "autobake";
pub const CONFIG_FILE_NAME: &str = "config.json";

// Defaults
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_DEPTH: usize = 10;
