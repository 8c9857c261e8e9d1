use axum::response::Response;

use super::fall_through::FallThroughError;
use super::response::normalize_and_respond;

/// Produces the final response for an error that reached the end of the
/// middleware stack.
///
/// Closures of the form `Fn(&FallThroughError) -> Response` are handlers, so
/// callers can replace the default body entirely.
pub trait FallThroughHandler: Send + Sync + 'static {
    fn handle(&self, err: &FallThroughError) -> Response;
}

/// Answers with the normalized `{ "errors": [...] }` payload
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFallThrough;

impl FallThroughHandler for DefaultFallThrough {
    fn handle(&self, err: &FallThroughError) -> Response {
        normalize_and_respond(err)
    }
}

impl<F> FallThroughHandler for F
where
    F: Fn(&FallThroughError) -> Response + Send + Sync + 'static,
{
    fn handle(&self, err: &FallThroughError) -> Response {
        self(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn test_default_handler_uses_error_status() {
        let err = FallThroughError::new().with_status(404);
        assert_eq!(
            DefaultFallThrough.handle(&err).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_closure_handler() {
        let handler =
            |_: &FallThroughError| (StatusCode::SERVICE_UNAVAILABLE, "custom").into_response();
        let handler: Box<dyn FallThroughHandler> = Box::new(handler);

        let response = handler.handle(&FallThroughError::new().with_status(400));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
