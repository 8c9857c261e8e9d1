use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::LoggingConfig;
use crate::errors::{ErrorDetailRecord, LoggerError};

/// Message attached to every logged or reported error event
pub const ERROR_EVENT_MESSAGE: &str = "middlewareError";

const REPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// An error that fell through to the end of the middleware stack
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub errors: Vec<ErrorDetailRecord>,
    /// Where a caught panic happened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    pub timestamp: String,
}

/// Destination for error events, such as a monitoring service
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Deliver one event. Delivery problems are handled by the reporter.
    async fn report(&self, event: &ErrorEvent);
}

/// Posts events as JSON to the configured reporting endpoint
#[derive(Debug, Clone)]
pub struct HttpReporter {
    http_client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpReporter {
    pub fn new(dsn: &str) -> Result<Self, LoggerError> {
        let invalid = |reason: String| LoggerError::InvalidDsn {
            dsn: dsn.to_string(),
            reason,
        };

        let endpoint = reqwest::Url::parse(dsn).map_err(|e| invalid(e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", endpoint.scheme())));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("request-logger/", env!("CARGO_PKG_VERSION")))
            .timeout(REPORT_TIMEOUT)
            .build()?;

        // The DSN may embed a key, so only the host is logged
        info!(
            host = endpoint.host_str().unwrap_or("unknown"),
            "Initialized error reporter"
        );

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

#[async_trait]
impl ErrorReporter for HttpReporter {
    async fn report(&self, event: &ErrorEvent) {
        let result = self
            .http_client
            .post(self.endpoint.clone())
            .json(event)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        if let Err(e) = result {
            warn!(
                request_id = event.request_id.as_deref().unwrap_or(""),
                error = %e,
                "Failed to deliver error report"
            );
        }
    }
}

/// Reporter for `config`, or `None` when no reporting endpoint is set
pub fn from_config(config: &LoggingConfig) -> Result<Option<Arc<dyn ErrorReporter>>, LoggerError> {
    match config.sentry_dsn.as_deref() {
        Some(dsn) => Ok(Some(Arc::new(HttpReporter::new(dsn)?))),
        None => Ok(None),
    }
}
