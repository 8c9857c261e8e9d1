//! Log transports: console, request log file, and error log file

mod error_log;

pub use error_log::ErrorLogLayer;

use std::fmt;
use std::path::Path;
use tracing::{Dispatch, Level};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::Targets,
    fmt::{self as tracing_fmt, MakeWriter},
    layer::SubscriberExt,
    EnvFilter, Layer,
};

use crate::config::{LoggingConfig, APP_LOG_FILE};
use crate::errors::LoggerError;
use crate::timestamp::ChicagoTime;

/// Target of per-request log lines, written to `app.log`
pub const REQUEST_TARGET: &str = "request_logger::requests";

/// Target of error events, written to the error log
pub const ERROR_TARGET: &str = "request_logger::errors";

/// Keeps the file writers alive. Dropping it flushes pending lines.
#[must_use = "dropping Telemetry stops the file writers"]
pub struct Telemetry {
    guards: Vec<WorkerGuard>,
}

impl Telemetry {
    fn inactive() -> Self {
        Self { guards: Vec::new() }
    }

    pub fn is_active(&self) -> bool {
        !self.guards.is_empty()
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("file_writers", &self.guards.len())
            .finish()
    }
}

/// Build the dispatcher for `config`, writing console output to `console`.
///
/// With logs disabled this returns a dispatcher that drops everything and
/// touches no files.
pub fn build<W>(config: &LoggingConfig, console: W) -> Result<(Dispatch, Telemetry), LoggerError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if config.disable_logs {
        return Ok((Dispatch::none(), Telemetry::inactive()));
    }

    let console_filter =
        EnvFilter::try_new(&config.log_level).map_err(|source| LoggerError::InvalidLogLevel {
            level: config.log_level.clone(),
            source,
        })?;

    // An existing directory is fine
    std::fs::create_dir_all(&config.log_dir)?;
    let (app_writer, app_guard) =
        tracing_appender::non_blocking(file_appender(&config.log_dir, APP_LOG_FILE)?);

    let (error_dir, error_file) = split_log_path(&config.error_log_path);
    let (error_writer, error_guard) =
        tracing_appender::non_blocking(file_appender(error_dir, error_file)?);

    let console_layer = tracing_fmt::layer()
        .with_writer(console)
        .with_timer(ChicagoTime)
        .with_target(false)
        .with_ansi(config.use_color())
        .with_filter(console_filter);

    let app_layer = tracing_fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_timer(ChicagoTime)
        .with_writer(app_writer)
        .with_filter(Targets::new().with_target(REQUEST_TARGET, Level::INFO));

    let error_layer = ErrorLogLayer::new(error_writer)
        .with_filter(Targets::new().with_target(ERROR_TARGET, Level::ERROR));

    let subscriber = tracing_subscriber::registry()
        .with(console_layer)
        .with(app_layer)
        .with(error_layer);

    Ok((
        Dispatch::new(subscriber),
        Telemetry {
            guards: vec![app_guard, error_guard],
        },
    ))
}

/// Build the transports with stdout as console and install them globally
pub fn init(config: &LoggingConfig) -> Result<Telemetry, LoggerError> {
    let (dispatch, telemetry) = build(config, std::io::stdout)?;
    tracing::dispatcher::set_global_default(dispatch)?;
    Ok(telemetry)
}

fn file_appender(dir: &Path, file_name: &str) -> Result<RollingFileAppender, LoggerError> {
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)?)
}

fn split_log_path(path: &Path) -> (&Path, &str) {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("errors.log");
    (dir, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;

    fn config_in(dir: &Path, overrides: ConfigOverrides) -> LoggingConfig {
        LoggingConfig::from_overrides(
            ConfigOverrides {
                log_dir: Some(dir.join("log")),
                error_log_path: Some(dir.join("errors.log")),
                ..overrides
            },
            |_| None,
        )
    }

    #[test]
    fn test_split_log_path() {
        assert_eq!(
            split_log_path(Path::new("./errors.log")),
            (Path::new("."), "errors.log")
        );
        assert_eq!(
            split_log_path(Path::new("errors.log")),
            (Path::new("."), "errors.log")
        );
        assert_eq!(
            split_log_path(Path::new("/var/log/app/failures.json")),
            (Path::new("/var/log/app"), "failures.json")
        );
    }

    #[test]
    fn test_disabled_logs_touch_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(
            dir.path(),
            ConfigOverrides {
                disable_logs: Some(true),
                ..Default::default()
            },
        );

        let (_dispatch, telemetry) = build(&config, std::io::sink).unwrap();
        assert!(!telemetry.is_active());
        assert!(!config.log_dir.exists());
        assert!(!config.error_log_path.exists());
    }

    #[test]
    fn test_creates_log_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), ConfigOverrides::default());

        let (_dispatch, telemetry) = build(&config, std::io::sink).unwrap();
        assert!(telemetry.is_active());
        assert!(config.app_log_path().exists());
        assert!(config.error_log_path.exists());
    }

    #[test]
    fn test_existing_log_dir_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("log")).unwrap();
        let config = config_in(dir.path(), ConfigOverrides::default());

        assert!(build(&config, std::io::sink).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(
            dir.path(),
            ConfigOverrides {
                log_level: Some("info,[unclosed".to_string()),
                ..Default::default()
            },
        );

        let err = build(&config, std::io::sink).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidLogLevel { .. }));
    }

    #[test]
    fn test_error_events_reach_error_log_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), ConfigOverrides::default());

        let (dispatch, telemetry) = build(&config, std::io::sink).unwrap();
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::error!(
                target: ERROR_TARGET,
                url = "/boom",
                errors = %r#"[{"detail":"boom"}]"#,
                "middlewareError"
            );
            tracing::info!(target: REQUEST_TARGET, status = 200, "GET / 200 1ms");
            tracing::error!("unrelated failure");
        });
        drop(telemetry);

        let errors = std::fs::read_to_string(&config.error_log_path).unwrap();
        let lines: Vec<serde_json::Value> = errors
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["message"], "middlewareError");
        assert_eq!(lines[0]["url"], "/boom");
        assert_eq!(lines[0]["errors"], serde_json::json!([{ "detail": "boom" }]));

        let requests = std::fs::read_to_string(config.app_log_path()).unwrap();
        assert_eq!(requests.lines().count(), 1);
        assert!(requests.contains("GET / 200 1ms"));
    }
}
