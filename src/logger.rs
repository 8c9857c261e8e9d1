use axum::{middleware, Router};
use std::fmt;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::info;

use crate::api::middleware::{
    error_logging_middleware, install_panic_hook, panic_to_response, request_logging_middleware,
    ErrorLogging, ErrorSink, RequestLogging,
};
use crate::config::{Environment, LoggingConfig};
use crate::errors::{DefaultFallThrough, FallThroughHandler, LoggerError};
use crate::health::HealthCheckFilter;
use crate::reporting::{self, ErrorReporter};

/// How requests and errors are logged, chosen once from the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingStrategy {
    /// No request log, no error log, no reporting; errors still get a response
    Disabled,
    /// Error log entries include the error as received
    Development,
    /// Error log entries carry only the normalized records
    Production,
}

impl LoggingStrategy {
    pub fn from_config(config: &LoggingConfig) -> Self {
        if config.disable_logs {
            LoggingStrategy::Disabled
        } else if config.environment.is_development() {
            LoggingStrategy::Development
        } else {
            LoggingStrategy::Production
        }
    }

    pub fn is_enabled(self) -> bool {
        !matches!(self, LoggingStrategy::Disabled)
    }
}

/// Attaches request logging and error logging to a router.
///
/// Layers only wrap routes that already exist, so attach after every route
/// has been registered. [`Logger::attach`] installs both in the right order.
pub struct Logger {
    strategy: LoggingStrategy,
    environment: Environment,
    cluster_name: Option<String>,
    health_check: HealthCheckFilter,
    handler: Arc<dyn FallThroughHandler>,
    reporter: Option<Arc<dyn ErrorReporter>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("strategy", &self.strategy)
            .field("environment", &self.environment)
            .field("cluster_name", &self.cluster_name)
            .field("reporter", &self.reporter.is_some())
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Build a logger from `config`.
    ///
    /// An invalid reporting endpoint is an error only while logging is
    /// enabled; disabled logging never contacts a reporter.
    pub fn new(config: &LoggingConfig) -> Result<Self, LoggerError> {
        let strategy = LoggingStrategy::from_config(config);
        let reporter = if strategy.is_enabled() {
            reporting::from_config(config)?
        } else {
            None
        };

        info!(
            strategy = ?strategy,
            environment = %config.environment,
            reporting = reporter.is_some(),
            "Request logger configured"
        );

        Ok(Self {
            strategy,
            environment: config.environment.clone(),
            cluster_name: config.cluster_name.clone(),
            health_check: config.health_check.clone(),
            handler: Arc::new(DefaultFallThrough),
            reporter,
        })
    }

    /// Replace the default `{ "errors": [...] }` response
    pub fn with_fall_through_handler<H>(mut self, handler: H) -> Self
    where
        H: FallThroughHandler,
    {
        self.handler = Arc::new(handler);
        self
    }

    /// Report errors to `reporter`. Ignored while logging is disabled.
    pub fn with_reporter<R>(mut self, reporter: R) -> Self
    where
        R: ErrorReporter + 'static,
    {
        if self.strategy.is_enabled() {
            self.reporter = Some(Arc::new(reporter));
        }
        self
    }

    pub fn strategy(&self) -> LoggingStrategy {
        self.strategy
    }

    /// Log every request that reaches `router`, except health checks
    pub fn attach_request_logging<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self.strategy {
            LoggingStrategy::Disabled => router,
            LoggingStrategy::Development | LoggingStrategy::Production => {
                let state = Arc::new(RequestLogging {
                    health_check: self.health_check.clone(),
                    cluster_name: self.cluster_name.clone(),
                });
                router.layer(middleware::from_fn_with_state(
                    state,
                    request_logging_middleware,
                ))
            }
        }
    }

    /// Catch panics and fall-through errors, log them, and answer with the
    /// configured handler
    pub fn attach_error_logging<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let sink = match self.strategy {
            LoggingStrategy::Disabled => None,
            LoggingStrategy::Development => Some(self.sink(true)),
            LoggingStrategy::Production => Some(self.sink(false)),
        };
        let state = Arc::new(ErrorLogging {
            handler: Arc::clone(&self.handler),
            sink,
        });
        install_panic_hook();

        router
            .layer(CatchPanicLayer::custom(panic_to_response))
            .layer(middleware::from_fn_with_state(
                state,
                error_logging_middleware,
            ))
    }

    /// Attach error logging, then request logging around it
    pub fn attach<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.attach_request_logging(self.attach_error_logging(router))
    }

    fn sink(&self, verbose: bool) -> ErrorSink {
        ErrorSink {
            environment: self.environment.clone(),
            cluster_name: self.cluster_name.clone(),
            reporter: self.reporter.clone(),
            verbose,
        }
    }
}
