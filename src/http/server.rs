//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (context, tracing, rate limit, auth, header checks)
//! - Bind the server to a listener
//! - Drain in-flight requests on shutdown
//!
//! Middleware order (outermost first): panic guard → request context →
//! trace → timeout → rate limit → auth → API header validation → body
//! limit → routes.

use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::bus::EventBus;
use crate::config::{AppConfig, AuthMode};
use crate::http::request::{self, RequestContext};
use crate::http::response::{ApiReply, ErrorDetail, ResponseKind, DEFAULT_ERROR_MESSAGE};
use crate::http::vitals;
use crate::security::auth::{self, CachedCredentials, CredentialSource};
use crate::security::jwks::BearerVerifier;
use crate::security::rate_limit::{self, RateLimiter};
use crate::security::crypto::HashAlgo;
use crate::store::cache::AuthCacheStore;
use crate::store::counter::CounterStore;
use crate::users;
use crate::users::service::UserRepo;

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub credentials: Arc<dyn CredentialSource>,
    pub limiter: Arc<RateLimiter>,
    pub bearer: Option<Arc<BearerVerifier>>,
    pub bus: EventBus,
    pub hash_algo: HashAlgo,
    pub started_at: Instant,
    pub request_count: Arc<AtomicU64>,
}

impl AppState {
    /// Assemble state from the configured backends.
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepo>,
        cache: Arc<dyn AuthCacheStore>,
        counters: Arc<dyn CounterStore>,
        bus: EventBus,
    ) -> Self {
        let hash_algo = config.auth.hash_algo.parse().unwrap_or_default();
        let bearer = (config.auth.mode == AuthMode::Bearer)
            .then(|| Arc::new(BearerVerifier::new(&config.auth, &config.app.name)));
        let credentials: Arc<dyn CredentialSource> =
            Arc::new(CachedCredentials::new(users.clone(), cache));
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit, counters));

        Self {
            config: Arc::new(config),
            users,
            credentials,
            limiter,
            bearer,
            bus,
            hash_algo,
            started_at: Instant::now(),
            request_count: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// HTTP server for the API service.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
}

impl HttpServer {
    /// Create a new HTTP server over the given state.
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        let router = build_router(&config, state);
        Self { router, config }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Build the router with every route and middleware layer. Exposed so the
/// test suite can drive the full chain without a socket.
pub fn build_router(config: &AppConfig, state: AppState) -> Router {
    Router::new()
        .route("/", get(vitals::root))
        .route("/health-check", get(vitals::health_check))
        .route("/vitals", get(vitals::vitals))
        .route("/long-response", get(vitals::long_response))
        .merge(users::docs::router())
        .nest("/api/v1/users", users::router::router())
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(RequestBodyLimitLayer::new(config.http.max_body_bytes))
        .layer(from_fn_with_state(state.clone(), request::api_headers_middleware))
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware))
        .layer(from_fn_with_state(state.clone(), rate_limit::rate_limit_middleware))
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.http.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(
            state.clone(),
            request::request_context_middleware,
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Unknown route: NotFound envelope.
async fn not_found(
    axum::extract::State(state): axum::extract::State<AppState>,
    context: RequestContext,
) -> Response {
    ApiReply::error(
        ResponseKind::NotFound,
        vec![ErrorDetail::reason("No route matches the requested path")],
    )
    .into_http(Some(context.request_id), state.config.app.debug)
}

/// Known route, wrong verb: MethodNotAllowed envelope.
async fn method_not_allowed(
    axum::extract::State(state): axum::extract::State<AppState>,
    context: RequestContext,
) -> Response {
    ApiReply::error(
        ResponseKind::MethodNotAllowed,
        vec![ErrorDetail::reason("Requested method is not allowed")],
    )
    .into_http(Some(context.request_id), state.config.app.debug)
}

/// Top-of-pipeline panic guard: a generic envelope, never internals.
fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    ApiReply::error(
        ResponseKind::UncaughtError,
        vec![ErrorDetail::message(DEFAULT_ERROR_MESSAGE)],
    )
    .into_http(None, false)
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
