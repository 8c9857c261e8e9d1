use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::errors::FallThroughError;

/// Plain success
pub async fn index() -> StatusCode {
    StatusCode::OK
}

/// Answers 500 directly, without going through the error path
pub async fn server_error() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Panics, exercising the catch-panic path
pub async fn unhandled_error() -> StatusCode {
    panic!("sad panda")
}

/// Fails with the body of an upstream service
pub async fn upstream_error() -> Result<StatusCode, FallThroughError> {
    Err(FallThroughError::new()
        .with_status(500)
        .with_body_errors(vec![json!({ "details": "sad Chewie" })]))
}

/// Fails with a client error carrying its own detail
pub async fn teapot() -> Result<StatusCode, FallThroughError> {
    Err(FallThroughError::new()
        .with_status(418)
        .with_detail("I'm a teapot"))
}

/// Liveness check; never logged
pub async fn status() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
