use axum::{
    extract::{Request, State},
    http::{HeaderValue, Uri},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::health::HealthCheckFilter;
use crate::telemetry::REQUEST_TARGET;

/// Header echoing the id assigned to each logged request
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Id assigned to a request, available to inner layers as an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Shared state of the request logging middleware
#[derive(Debug, Clone)]
pub struct RequestLogging {
    pub health_check: HealthCheckFilter,
    pub cluster_name: Option<String>,
}

/// Middleware to log all HTTP requests and responses with structured data
pub async fn request_logging_middleware(
    State(state): State<Arc<RequestLogging>>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let skip = state.health_check.should_skip(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = sanitize_query(request.uri().query().unwrap_or(""));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    if skip {
        return response;
    }

    let duration_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();
    let cluster = state.cluster_name.as_deref().unwrap_or("");

    match status {
        500.. => error!(
            target: REQUEST_TARGET,
            request_id = %request_id,
            method = %method,
            path = %path,
            query = %query,
            status,
            duration_ms,
            cluster,
            "{} {} {} {}ms",
            method,
            path,
            status,
            duration_ms
        ),
        400..=499 => warn!(
            target: REQUEST_TARGET,
            request_id = %request_id,
            method = %method,
            path = %path,
            query = %query,
            status,
            duration_ms,
            cluster,
            "{} {} {} {}ms",
            method,
            path,
            status,
            duration_ms
        ),
        _ => info!(
            target: REQUEST_TARGET,
            request_id = %request_id,
            method = %method,
            path = %path,
            query = %query,
            status,
            duration_ms,
            cluster,
            "{} {} {} {}ms",
            method,
            path,
            status,
            duration_ms
        ),
    }

    response
}

/// Path plus masked query, safe to log or send off-host
pub(crate) fn sanitized_url(uri: &Uri) -> String {
    match uri.query().map(sanitize_query).filter(|query| !query.is_empty()) {
        Some(query) => format!("{}?{}", uri.path(), query),
        None => uri.path().to_string(),
    }
}

/// Mask credentials passed as query parameters
pub(crate) fn sanitize_query(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive(key) => format!("{}=***", key),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_sensitive(key: &str) -> bool {
    ["api_key", "token", "password", "secret"]
        .iter()
        .any(|sensitive| key.eq_ignore_ascii_case(sensitive))
}
