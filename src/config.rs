use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::health::HealthCheckFilter;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "./log";
pub const DEFAULT_ERROR_LOG_PATH: &str = "./errors.log";
pub const APP_LOG_FILE: &str = "app.log";

/// Deployment mode, taken from `NODE_ENV`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    /// Any mode other than development, keeping its name for reports
    Production(String),
}

impl Environment {
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("development") => Environment::Development,
            Some(other) if !other.is_empty() => Environment::Production(other.to_string()),
            _ => Environment::Production("production".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Environment::Development => "development",
            Environment::Production(name) => name,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration, built once at startup and passed by reference
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
    pub environment: Environment,
    pub disable_logs: bool,
    pub cluster_name: Option<String>,
    pub colorize: bool,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub error_log_path: PathBuf,
    pub health_check: HealthCheckFilter,
}

/// Values supplied in code. Each one that is set beats the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sentry_dsn: Option<String>,
    pub node_env: Option<String>,
    pub disable_logs: Option<bool>,
    pub cluster_name: Option<String>,
    pub colorize: Option<bool>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub error_log_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::from_overrides(ConfigOverrides::default(), |_| None)
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_env_with(ConfigOverrides::default())
    }

    pub fn from_env_with(overrides: ConfigOverrides) -> Self {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_overrides(overrides, |key| env::var(key).ok())
    }

    /// Merge explicit overrides with values found through `lookup`.
    ///
    /// Boolean switches are only turned on by the exact string `"true"`.
    pub fn from_overrides<F>(overrides: ConfigOverrides, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let flag = |key: &str| lookup(key).is_some_and(|value| value == "true");

        LoggingConfig {
            sentry_dsn: overrides.sentry_dsn.or_else(|| text("SENTRY_DSN")),
            environment: Environment::from_name(
                overrides
                    .node_env
                    .or_else(|| text("NODE_ENV"))
                    .as_deref(),
            ),
            disable_logs: overrides
                .disable_logs
                .unwrap_or_else(|| flag("DISABLE_LOGS")),
            cluster_name: overrides.cluster_name.or_else(|| text("CLUSTER_NAME")),
            colorize: overrides.colorize.unwrap_or_else(|| flag("COLORIZE")),
            log_level: overrides
                .log_level
                .or_else(|| text("LOG_LEVEL"))
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_dir: overrides
                .log_dir
                .or_else(|| text("LOG_DIR").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            error_log_path: overrides
                .error_log_path
                .or_else(|| text("ERROR_LOG_PATH").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ERROR_LOG_PATH)),
            health_check: HealthCheckFilter::from_patterns(
                text("HEALTH_CHECK_USER_AGENTS").as_deref(),
            ),
        }
    }

    /// Console output is colored in development or when forced
    pub fn use_color(&self) -> bool {
        self.environment.is_development() || self.colorize
    }

    pub fn app_log_path(&self) -> PathBuf {
        self.log_dir.join(APP_LOG_FILE)
    }
}
