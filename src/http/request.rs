//! Request identity and inbound header validation.
//!
//! # Responsibilities
//! - Generate a unique request ID as early as possible
//! - Build the per-request context (ID + auth principal) once, up front
//! - Echo the request ID back on the response
//! - Validate the documented `x-*` API headers
//! - Reject methods outside the supported verb set
//!
//! # Design Decisions
//! - The context is an explicit value carried in request extensions and read
//!   through an extractor; handlers never mutate it
//! - Per-request logging skips the probe routes to keep logs quiet

use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::http::response::{ApiReply, ErrorDetail, ResponseKind};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::auth::AuthUser;

/// Response header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Verbs the API accepts; anything else gets a MethodNotAllowed envelope.
const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Routes excluded from per-request info logging.
const NO_LOG_ROUTES: [&str; 5] = ["/", "/health-check", "/vitals", "/long-response", "/favicon.ico"];

/// Immutable per-request context, constructed once at the top of the
/// middleware chain and enriched with the auth principal before any
/// controller runs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation ID for this request.
    pub request_id: Uuid,
    /// Authenticated principal, present after successful basic auth.
    pub auth: Option<AuthUser>,
}

impl RequestContext {
    fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            auth: None,
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(RequestContext::new))
    }
}

/// Outermost middleware: creates the request context, counts the request,
/// stamps the response with `x-request-id` and emits the access log line.
pub async fn request_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let context = RequestContext::new();
    let request_id = context.request_id;
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    request.extensions_mut().insert(context);
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = response.status().as_u16();
    metrics::record_request(&method, status, started);

    if !is_log_exempt(&path) {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request handled"
        );
    }

    response
}

fn is_log_exempt(path: &str) -> bool {
    NO_LOG_ROUTES.contains(&path) || path.starts_with("/api-docs")
}

/// Validates the documented `x-*` headers on API routes and rejects
/// unsupported verbs everywhere.
pub async fn api_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|context| context.request_id);
    let debug = state.config.app.debug;

    if !ALLOWED_METHODS.contains(request.method()) {
        return ApiReply::error(
            ResponseKind::MethodNotAllowed,
            vec![ErrorDetail::reason("Requested method is not allowed")],
        )
        .into_http(request_id, debug);
    }

    if request.uri().path().starts_with("/api") {
        if let Err(reason) = validate_api_headers(request.headers()) {
            return ApiReply::bad_request(vec![ErrorDetail::new("Invalid request headers", reason)])
                .into_http(request_id, debug);
        }
    }

    next.run(request).await
}

/// Check the constrained API headers; unconstrained `x-*` headers
/// (tokens, api key, versions) pass through untouched.
fn validate_api_headers(headers: &HeaderMap) -> Result<(), String> {
    if let Some(value) = header_str(headers, "x-language") {
        if value != "en" {
            return Err("\"x-language\" must be [en]".to_string());
        }
    }
    if let Some(value) = header_str(headers, "x-time-zone") {
        if !is_time_zone_offset(value) {
            return Err(format!(
                "\"x-time-zone\" with value \"{value}\" fails to match the required pattern"
            ));
        }
    }
    if let Some(value) = header_str(headers, "x-timestamp") {
        if value.parse::<i64>().is_err() {
            return Err("\"x-timestamp\" must be in timestamp or number of milliseconds".to_string());
        }
    }
    Ok(())
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Matches `±HH:MM` with hours 00..=23 and minutes 00..=59 (e.g. `+05:30`).
fn is_time_zone_offset(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 6 || (bytes[0] != b'+' && bytes[0] != b'-') || bytes[3] != b':' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| -> Option<u32> { value.get(range)?.parse().ok() };
    match (digits(1..3), digits(4..6)) {
        (Some(hours), Some(minutes)) => hours <= 23 && minutes <= 59,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_zone_offset_accepts_valid_offsets() {
        for value in ["+05:30", "-23:59", "+00:00"] {
            assert!(is_time_zone_offset(value), "{value} should be valid");
        }
    }

    #[test]
    fn time_zone_offset_rejects_malformed_values() {
        for value in ["05:30", "+24:00", "+05:60", "+5:30", "+05-30", "", "+0530"] {
            assert!(!is_time_zone_offset(value), "{value} should be invalid");
        }
    }

    #[test]
    fn api_header_rules() {
        let mut headers = HeaderMap::new();
        headers.insert("x-language", HeaderValue::from_static("en"));
        headers.insert("x-time-zone", HeaderValue::from_static("+05:30"));
        headers.insert("x-timestamp", HeaderValue::from_static("1656230400000"));
        assert!(validate_api_headers(&headers).is_ok());

        headers.insert("x-language", HeaderValue::from_static("fr"));
        assert!(validate_api_headers(&headers).is_err());
    }

    #[test]
    fn log_exemptions_cover_probe_and_docs_routes() {
        assert!(is_log_exempt("/"));
        assert!(is_log_exempt("/health-check"));
        assert!(is_log_exempt("/api-docs/openapi.json"));
        assert!(!is_log_exempt("/api/v1/users"));
    }
}
