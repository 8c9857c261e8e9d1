use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::fall_through::FallThroughError;

/// One entry of the `errors` array sent to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetailRecord {
    /// Record built from the error's own detail or message
    Detail { detail: String },
    /// Record copied unchanged from an upstream body
    External(Value),
}

/// Uniform error payload: `{ "errors": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedErrorResponse {
    pub errors: Vec<ErrorDetailRecord>,
}

/// Status used whenever the error does not carry a usable one
pub const DEFAULT_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// Accept only codes in the 100-599 range.
pub fn resolve_status(status: Option<u16>) -> StatusCode {
    status
        .filter(|code| (100..600).contains(code))
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(DEFAULT_STATUS)
}

/// Build the status and payload for an error.
///
/// The locally built `{ detail }` record, if any, always precedes the
/// records copied from `body.errors`.
pub fn normalize(err: &FallThroughError) -> (StatusCode, NormalizedErrorResponse) {
    let mut errors = Vec::with_capacity(1 + err.body_errors().len());

    if let Some(detail) = err.summary() {
        errors.push(ErrorDetailRecord::Detail {
            detail: detail.to_owned(),
        });
    }
    errors.extend(
        err.body_errors()
            .iter()
            .cloned()
            .map(ErrorDetailRecord::External),
    );

    (resolve_status(err.status), NormalizedErrorResponse { errors })
}

/// Default fall-through response: normalized status plus JSON body
pub fn normalize_and_respond(err: &FallThroughError) -> Response {
    let (status, body) = normalize(err);
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn respond(err: &FallThroughError) -> (StatusCode, Value) {
        let response = normalize_and_respond(err);
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_empty_error_defaults_to_500() {
        let (status, body) = normalize(&FallThroughError::new());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.errors.is_empty());
    }

    #[test]
    fn test_detail_becomes_first_record() {
        let err = FallThroughError::new().with_detail("X");
        let (_, body) = normalize(&err);
        assert_eq!(
            body.errors,
            vec![ErrorDetailRecord::Detail {
                detail: "X".to_string()
            }]
        );
    }

    #[test]
    fn test_message_used_without_detail() {
        let err = FallThroughError::new().with_message("Y");
        let (_, body) = normalize(&err);
        assert_eq!(
            body.errors.first(),
            Some(&ErrorDetailRecord::Detail {
                detail: "Y".to_string()
            })
        );
    }

    #[test]
    fn test_detail_precedes_body_errors() {
        let err = FallThroughError::new()
            .with_detail("local")
            .with_body_errors(vec![json!({ "code": "A" }), json!({ "code": "B" })]);
        let (_, body) = normalize(&err);

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "errors": [{ "detail": "local" }, { "code": "A" }, { "code": "B" }] })
        );
    }

    #[test]
    fn test_status_is_respected() {
        let err = FallThroughError::new().with_status(418);
        let (status, _) = normalize(&err);
        assert_eq!(status, StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn test_invalid_status_falls_back() {
        for code in [0, 42, 600, 999, u16::MAX] {
            assert_eq!(
                resolve_status(Some(code)),
                StatusCode::INTERNAL_SERVER_ERROR,
                "code {}",
                code
            );
        }
        assert_eq!(resolve_status(None), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resolve_status(Some(100)), StatusCode::CONTINUE);
        assert_eq!(resolve_status(Some(599)).as_u16(), 599);
    }

    #[tokio::test]
    async fn test_upstream_errors_pass_through_unchanged() {
        let err = FallThroughError::from_value(&json!({
            "status": 500,
            "body": { "errors": [{ "details": "sad Chewie" }] }
        }));

        let (status, body) = respond(&err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "errors": [{ "details": "sad Chewie" }] }));
    }

    #[tokio::test]
    async fn test_response_is_json() {
        let response = normalize_and_respond(&FallThroughError::new());
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_respond_is_idempotent() {
        let err = FallThroughError::new()
            .with_status(409)
            .with_message("conflict")
            .with_body_errors(vec![json!({ "field": "name" })]);

        let first = tokio_test::block_on(respond(&err));
        let second = tokio_test::block_on(respond(&err));
        assert_eq!(first, second);
        assert_eq!(first.0, StatusCode::CONFLICT);
    }
}
