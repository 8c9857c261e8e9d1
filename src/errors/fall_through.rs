use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::response::normalize_and_respond;

/// Error shape carried from a handler to the error-logging middleware.
///
/// Every field is optional. Empty strings and a zero status are treated as
/// absent during normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FallThroughError {
    /// HTTP status to answer with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Preferred human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Fallback description, used when `detail` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Body of an upstream error response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ErrorBody>,
    /// Source location of a caught panic; logged, never sent to clients
    #[serde(skip)]
    pub location: Option<String>,
    /// Captured backtrace of a caught panic, when backtraces are enabled
    #[serde(skip)]
    pub backtrace: Option<String>,
}

/// Upstream error body carrying pre-formed error records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
}

impl FallThroughError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach records that are copied verbatim into the response
    pub fn with_body_errors(mut self, errors: Vec<Value>) -> Self {
        self.body = Some(ErrorBody {
            errors: Some(errors),
        });
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Wrap any error, using its display output as the message
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self::new().with_message(err.to_string())
    }

    /// Read an error out of an arbitrary JSON value.
    ///
    /// Never fails: fields of the wrong JSON type are dropped, so `null`, a
    /// string, or an upstream payload of unknown shape all produce a usable
    /// (possibly empty) error.
    pub fn from_value(value: &Value) -> Self {
        let status = value
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok());
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
        let body = value.get("body").map(|body| ErrorBody {
            errors: body.get("errors").and_then(Value::as_array).cloned(),
        });

        Self {
            status,
            detail: text("detail"),
            message: text("message"),
            body,
            ..Self::default()
        }
    }

    /// The description that becomes the leading `{ detail }` record
    pub fn summary(&self) -> Option<&str> {
        self.detail
            .as_deref()
            .filter(|detail| !detail.is_empty())
            .or_else(|| self.message.as_deref().filter(|message| !message.is_empty()))
    }

    /// Records supplied by an upstream body, if it carried any
    pub fn body_errors(&self) -> &[Value] {
        self.body
            .as_ref()
            .and_then(|body| body.errors.as_deref())
            .unwrap_or_default()
    }
}

impl fmt::Display for FallThroughError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.summary() {
            Some(summary) => write!(f, "{}", summary),
            None => write!(f, "unspecified error"),
        }
    }
}

impl From<anyhow::Error> for FallThroughError {
    fn from(err: anyhow::Error) -> Self {
        Self::new().with_message(err.to_string())
    }
}

/// Renders the default response and keeps a copy of the error in the
/// response extensions, where the error-logging middleware picks it up.
impl IntoResponse for FallThroughError {
    fn into_response(self) -> Response {
        let mut response = normalize_and_respond(&self);
        response.extensions_mut().insert(self);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_summary_prefers_detail() {
        let err = FallThroughError::new()
            .with_detail("from detail")
            .with_message("from message");
        assert_eq!(err.summary(), Some("from detail"));
    }

    #[test]
    fn test_summary_skips_empty_strings() {
        let err = FallThroughError::new().with_detail("").with_message("kept");
        assert_eq!(err.summary(), Some("kept"));

        let err = FallThroughError::new().with_detail("").with_message("");
        assert_eq!(err.summary(), None);
    }

    #[test]
    fn test_from_value_reads_known_fields() {
        let err = FallThroughError::from_value(&json!({
            "status": 418,
            "message": "short and stout",
            "body": { "errors": [{ "code": "TEAPOT" }] }
        }));

        assert_eq!(err.status, Some(418));
        assert_eq!(err.detail, None);
        assert_eq!(err.summary(), Some("short and stout"));
        assert_eq!(err.body_errors(), &[json!({ "code": "TEAPOT" })]);
        assert_eq!(err.location, None);
    }

    #[test]
    fn test_location_stays_out_of_serialized_form() {
        let err = FallThroughError::new()
            .with_message("boom")
            .with_location("src/api/handlers.rs:20:5");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "message": "boom" })
        );
    }

    #[test]
    fn test_from_value_tolerates_any_shape() {
        for value in [
            json!(null),
            json!("just a string"),
            json!([1, 2, 3]),
            json!({ "status": "teapot", "detail": 12, "body": { "errors": "nope" } }),
            json!({ "status": 70000 }),
        ] {
            let err = FallThroughError::from_value(&value);
            assert_eq!(err.status, None, "status from {}", value);
            assert_eq!(err.summary(), None, "summary from {}", value);
            assert!(err.body_errors().is_empty(), "body errors from {}", value);
        }
    }

    #[test]
    fn test_from_error_uses_display() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = FallThroughError::from_error(&io);
        assert_eq!(err.message.as_deref(), Some("disk on fire"));
    }

    #[test]
    fn test_from_anyhow() {
        let err: FallThroughError = anyhow::anyhow!("upstream timed out").into();
        assert_eq!(err.to_string(), "upstream timed out");
    }

    #[test]
    fn test_display_without_summary() {
        assert_eq!(FallThroughError::new().to_string(), "unspecified error");
    }

    #[test]
    fn test_into_response_keeps_error_in_extensions() {
        let err = FallThroughError::new().with_status(404).with_detail("missing");
        let response = err.clone().into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.extensions().get::<FallThroughError>(), Some(&err));
    }
}
