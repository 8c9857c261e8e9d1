use axum::{routing::get, Router};

use super::handlers::{index, server_error, status, teapot, unhandled_error, upstream_error};
use crate::health::STATUS_ROUTE;
use crate::logger::Logger;

/// Demo routes wrapped by `logger`
pub fn create_router(logger: &Logger) -> Router {
    let router = Router::new()
        .route("/", get(index).post(index))
        .route("/error", get(server_error))
        .route("/unhandledError", get(unhandled_error))
        .route("/nextError", get(upstream_error))
        .route("/teapot", get(teapot))
        .route(STATUS_ROUTE, get(status));

    // Attach after all routes are registered so both layers wrap them
    logger.attach(router)
}
