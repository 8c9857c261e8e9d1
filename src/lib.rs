//! Request logging, error logging, and a fallback error response for axum
//! applications.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use request_logger::{telemetry, Logger, LoggingConfig};
//!
//! # fn main() -> Result<(), request_logger::LoggerError> {
//! let config = LoggingConfig::from_env();
//! let _telemetry = telemetry::init(&config)?;
//! let logger = Logger::new(&config)?;
//!
//! let app: Router = logger.attach(Router::new().route("/", get(|| async { "ok" })));
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod health;
pub mod logger;
pub mod reporting;
pub mod telemetry;
pub mod timestamp;

pub use config::{ConfigOverrides, Environment, LoggingConfig};
pub use errors::{
    normalize, normalize_and_respond, DefaultFallThrough, ErrorDetailRecord, FallThroughError,
    FallThroughHandler, LoggerError, NormalizedErrorResponse,
};
pub use logger::{Logger, LoggingStrategy};
pub use reporting::{ErrorEvent, ErrorReporter, HttpReporter};
