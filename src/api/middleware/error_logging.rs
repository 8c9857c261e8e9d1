use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Once};
use tracing::error;

use super::request_logging::{sanitized_url, RequestId};
use crate::config::Environment;
use crate::errors::{normalize, FallThroughError, FallThroughHandler};
use crate::reporting::{ErrorEvent, ErrorReporter, ERROR_EVENT_MESSAGE};
use crate::telemetry::ERROR_TARGET;
use crate::timestamp;

/// Shared state of the error logging middleware
pub struct ErrorLogging {
    pub handler: Arc<dyn FallThroughHandler>,
    /// Where errors are recorded; `None` when logging is disabled
    pub sink: Option<ErrorSink>,
}

/// Records fall-through errors to the error log and the reporter
pub struct ErrorSink {
    pub environment: Environment,
    pub cluster_name: Option<String>,
    pub reporter: Option<Arc<dyn ErrorReporter>>,
    /// Also log the error as received, not only its normalized records
    pub verbose: bool,
}

impl fmt::Debug for ErrorLogging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorLogging")
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSink")
            .field("environment", &self.environment)
            .field("cluster_name", &self.cluster_name)
            .field("reporter", &self.reporter.is_some())
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl ErrorSink {
    fn record(
        &self,
        err: &FallThroughError,
        request_id: Option<String>,
        method: String,
        url: String,
    ) {
        let (status, normalized) = normalize(err);
        let event = ErrorEvent {
            message: ERROR_EVENT_MESSAGE,
            request_id,
            method,
            url,
            status: status.as_u16(),
            errors: normalized.errors,
            location: err.location.clone(),
            environment: self.environment.to_string(),
            cluster_name: self.cluster_name.clone(),
            timestamp: timestamp::timestamp(),
        };
        let errors = serde_json::to_string(&event.errors).unwrap_or_default();
        let request_id = event.request_id.as_deref().unwrap_or("");
        let cluster = event.cluster_name.as_deref().unwrap_or("");
        let location = err.location.as_deref();
        let backtrace = err.backtrace.as_deref();

        if self.verbose {
            error!(
                target: ERROR_TARGET,
                request_id,
                method = %event.method,
                url = %event.url,
                status = event.status,
                errors = %errors,
                cluster,
                location,
                backtrace,
                error = ?err,
                "{}",
                ERROR_EVENT_MESSAGE
            );
        } else {
            error!(
                target: ERROR_TARGET,
                request_id,
                method = %event.method,
                url = %event.url,
                status = event.status,
                errors = %errors,
                cluster,
                location,
                backtrace,
                "{}",
                ERROR_EVENT_MESSAGE
            );
        }

        if let Some(reporter) = &self.reporter {
            let reporter = Arc::clone(reporter);
            tokio::spawn(async move {
                reporter.report(&event).await;
            });
        }
    }
}

/// Middleware that turns fall-through errors into their final response.
///
/// Inner layers mark an error by storing a [`FallThroughError`] in the
/// response extensions; responses without one pass through untouched.
pub async fn error_logging_middleware(
    State(state): State<Arc<ErrorLogging>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let url = sanitized_url(request.uri());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone());

    let response = next.run(request).await;
    let Some(err) = response.extensions().get::<FallThroughError>().cloned() else {
        return response;
    };

    if let Some(sink) = &state.sink {
        sink.record(&err, request_id, method, url);
    }

    state.handler.handle(&err)
}

thread_local! {
    static PANIC_SITE: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Where the most recent panic on this thread happened
#[derive(Debug, Clone, Default)]
struct PanicSite {
    location: Option<String>,
    backtrace: Option<String>,
}

/// Install a process-wide panic hook that remembers where each panic
/// happened, for [`panic_to_response`] on the same thread.
///
/// Runs once; the previously installed hook still runs afterwards.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
            let backtrace = Backtrace::capture();
            let backtrace = matches!(backtrace.status(), BacktraceStatus::Captured)
                .then(|| backtrace.to_string());

            PANIC_SITE.with(|site| {
                *site.borrow_mut() = Some(PanicSite {
                    location,
                    backtrace,
                })
            });
            previous(info);
        }));
    });
}

/// Convert a handler panic into a fall-through error carrying its message,
/// plus its location when [`install_panic_hook`] has run
pub fn panic_to_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "Unhandled panic".to_string()
    };
    let site = PANIC_SITE
        .with(|site| site.borrow_mut().take())
        .unwrap_or_default();

    let mut err = FallThroughError::new().with_message(message);
    err.location = site.location;
    err.backtrace = site.backtrace;
    err.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_panic_message_from_str() {
        let response = panic_to_response(Box::new("sad panda"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = response.extensions().get::<FallThroughError>().unwrap();
        assert_eq!(err.summary(), Some("sad panda"));
    }

    #[test]
    fn test_panic_message_from_string() {
        let response = panic_to_response(Box::new(format!("index {} out of range", 7)));
        let err = response.extensions().get::<FallThroughError>().unwrap();
        assert_eq!(err.summary(), Some("index 7 out of range"));
    }

    #[test]
    fn test_panic_location_is_recorded() {
        install_panic_hook();
        let payload = std::panic::catch_unwind(|| panic!("sad panda")).unwrap_err();

        let response = panic_to_response(payload);
        let err = response.extensions().get::<FallThroughError>().unwrap();
        assert_eq!(err.summary(), Some("sad panda"));
        assert!(err
            .location
            .as_deref()
            .unwrap()
            .contains("error_logging.rs"));
    }

    #[test]
    fn test_panic_site_is_consumed() {
        install_panic_hook();
        let payload = std::panic::catch_unwind(|| panic!("first")).unwrap_err();
        panic_to_response(payload);

        let response = panic_to_response(Box::new("no hook run"));
        let err = response.extensions().get::<FallThroughError>().unwrap();
        assert_eq!(err.location, None);
    }

    #[test]
    fn test_panic_with_opaque_payload() {
        let response = panic_to_response(Box::new(42_u8));
        let err = response.extensions().get::<FallThroughError>().unwrap();
        assert_eq!(err.summary(), Some("Unhandled panic"));
    }
}
