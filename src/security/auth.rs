//! Authentication middleware.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → allow-list check (open routes bypass verification)
//!     → bearer: verify signed token against remote key set
//!     → basic: decode credentials, cache-then-store lookup, salted-hash compare
//!     → attach AuthUser to the request context
//! ```
//!
//! # Design Decisions
//! - Mode is static configuration, not per-request negotiation
//! - Basic failures share one client-facing message; reasons differ only in
//!   the debug-gated `reason` field, so callers cannot probe which usernames
//!   exist
//! - Credential lookups go through a source trait: production wires the
//!   cache-aside store, tests wire an in-memory map

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthMode;
use crate::http::request::RequestContext;
use crate::http::response::{ApiReply, ErrorDetail, ResponseKind};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::crypto;
use crate::store::cache::AuthCacheStore;
use crate::store::StoreError;
use crate::users::service::UserRepo;

/// Routes exempt from authentication, as (path, method) pairs.
/// Matching ignores a single trailing slash.
pub const NO_AUTH_ROUTES: [(&str, Method); 7] = [
    ("/api/v1/users", Method::POST),
    ("/", Method::GET),
    ("/health-check", Method::GET),
    ("/vitals", Method::GET),
    ("/long-response", Method::GET),
    ("/favicon.ico", Method::GET),
    ("/api-docs", Method::GET),
];

const INVALID_CREDENTIALS: &str = "Invalid authentication credentials.";
const MISSING_HEADER: &str = "Missing authorization header.";

/// Authenticated principal attached to the request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// Internal row identifier.
    pub id: i32,
    /// External identifier.
    pub uuid: Uuid,
}

/// Credential subset cached per user for basic-auth verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthRecord {
    pub id: i32,
    pub uuid: Uuid,
    pub password: String,
    pub salt: String,
}

/// Source of stored credentials for basic auth.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn find(&self, uuid: Uuid) -> Result<Option<AuthRecord>, StoreError>;
}

/// Cache-aside credential lookup: consult the auth cache first, fall back
/// to the authoritative store and repopulate with set-if-absent so a
/// concurrent first writer wins.
pub struct CachedCredentials {
    repo: Arc<dyn UserRepo>,
    cache: Arc<dyn AuthCacheStore>,
}

impl CachedCredentials {
    pub fn new(repo: Arc<dyn UserRepo>, cache: Arc<dyn AuthCacheStore>) -> Self {
        Self { repo, cache }
    }
}

#[async_trait]
impl CredentialSource for CachedCredentials {
    async fn find(&self, uuid: Uuid) -> Result<Option<AuthRecord>, StoreError> {
        if let Some(record) = self.cache.get(uuid).await? {
            metrics::record_auth_cache(true);
            return Ok(Some(record));
        }
        metrics::record_auth_cache(false);

        let record = self.repo.find_credentials(uuid).await?;
        if let Some(record) = &record {
            self.cache.set_if_absent(uuid, record).await?;
        }
        Ok(record)
    }
}

/// Whether `(path, method)` is on the open-route list.
pub fn is_open_route(path: &str, method: &Method) -> bool {
    let normalized = if path == "/" {
        path
    } else {
        path.trim_end_matches('/')
    };
    NO_AUTH_ROUTES
        .iter()
        .any(|(url, open_method)| normalized == *url && method == open_method)
        || (normalized.starts_with("/api-docs/") && *method == Method::GET)
}

/// Mode-switched authentication middleware.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mode = state.config.auth.mode;
    if mode == AuthMode::None {
        return next.run(request).await;
    }
    if is_open_route(request.uri().path(), request.method()) {
        return next.run(request).await;
    }

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|context| context.request_id);
    let debug = state.config.app.debug;

    match mode {
        AuthMode::Bearer => {
            let Some(verifier) = state.bearer.clone() else {
                return ApiReply::internal(
                    "An unexpected error occurred.",
                    "Bearer verifier is not configured.",
                )
                .into_http(request_id, debug);
            };
            let token = request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "));
            let Some(token) = token else {
                return unauthorized(MISSING_HEADER, MISSING_HEADER, request_id, debug);
            };
            match verifier.verify(token).await {
                Ok(_claims) => next.run(request).await,
                Err(error) => {
                    tracing::debug!(request_id = ?request_id, error = %error, "Bearer verification failed");
                    unauthorized(
                        ResponseKind::Unauthorized.default_message(),
                        error.to_string(),
                        request_id,
                        debug,
                    )
                }
            }
        }
        AuthMode::Basic => basic_auth(state, request, next, request_id, debug).await,
        AuthMode::None => next.run(request).await,
    }
}

async fn basic_auth(
    state: AppState,
    mut request: Request,
    next: Next,
    request_id: Option<Uuid>,
    debug: bool,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let credentials = match header.and_then(|value| value.strip_prefix("Basic ")) {
        Some(encoded) => encoded,
        None => return unauthorized(MISSING_HEADER, MISSING_HEADER, request_id, debug),
    };

    let decoded = match BASE64
        .decode(credentials)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    {
        Some(decoded) => decoded,
        None => {
            return unauthorized(
                INVALID_CREDENTIALS,
                "Malformed basic credentials.",
                request_id,
                debug,
            )
        }
    };
    let (username, password) = match decoded.split_once(':') {
        Some(parts) => parts,
        None => {
            return unauthorized(
                INVALID_CREDENTIALS,
                "Malformed basic credentials.",
                request_id,
                debug,
            )
        }
    };

    // Credential shape: username must be a UUID, password non-empty.
    let uuid = match Uuid::parse_str(username) {
        Ok(uuid) => uuid,
        Err(_) => {
            return unauthorized(
                INVALID_CREDENTIALS,
                "\"username\" must be a valid GUID",
                request_id,
                debug,
            )
        }
    };
    if password.is_empty() {
        return unauthorized(
            INVALID_CREDENTIALS,
            "\"password\" is not allowed to be empty",
            request_id,
            debug,
        );
    }

    let record = match state.credentials.find(uuid).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return unauthorized(
                INVALID_CREDENTIALS,
                "User details not found.",
                request_id,
                debug,
            )
        }
        Err(error) => {
            tracing::error!(request_id = ?request_id, error = %error, "Credential lookup failed");
            return ApiReply::internal("An unexpected error occurred.", error.to_string())
                .into_http(request_id, debug);
        }
    };

    if crypto::matches(state.hash_algo, password, &record.password, &record.salt) {
        if let Some(context) = request.extensions_mut().get_mut::<RequestContext>() {
            context.auth = Some(AuthUser {
                id: record.id,
                uuid: record.uuid,
            });
        }
        return next.run(request).await;
    }

    unauthorized(INVALID_CREDENTIALS, INVALID_CREDENTIALS, request_id, debug)
}

fn unauthorized(message: &str, reason: impl Into<String>, request_id: Option<Uuid>, debug: bool) -> Response {
    ApiReply::error(
        ResponseKind::Unauthorized,
        vec![ErrorDetail::new(message, reason)],
    )
    .into_http(request_id, debug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_routes_match_exact_and_trailing_slash() {
        assert!(is_open_route("/", &Method::GET));
        assert!(is_open_route("/health-check", &Method::GET));
        assert!(is_open_route("/health-check/", &Method::GET));
        assert!(is_open_route("/api/v1/users", &Method::POST));
        assert!(is_open_route("/api/v1/users/", &Method::POST));
        assert!(is_open_route("/api-docs/openapi.json", &Method::GET));
    }

    #[test]
    fn protected_routes_do_not_match() {
        assert!(!is_open_route("/api/v1/users", &Method::GET));
        assert!(!is_open_route("/api/v1/users/abc", &Method::POST));
        assert!(!is_open_route("/health-check", &Method::POST));
    }
}
