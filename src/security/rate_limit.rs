//! Rate limiting middleware.
//!
//! Fixed-window counter per client address backed by the shared counter
//! store. Loopback addresses bypass entirely. Exceeding the cap yields a
//! TooManyRequest envelope so the uniform response contract holds even for
//! rejected traffic.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

use crate::config::RateLimitConfig;
use crate::http::request::RequestContext;
use crate::http::response::{ApiReply, ErrorDetail, Meta, ResponseKind};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::store::counter::{CounterStore, WindowHit};

/// Shared limiter state: the counter store plus the window policy.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    window: Duration,
    max_requests: u64,
    exempt: Vec<IpAddr>,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, store: Arc<dyn CounterStore>) -> Self {
        let exempt = config
            .exempt_ips
            .iter()
            .filter_map(|ip| ip.parse().ok())
            .collect();
        Self {
            store,
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
            exempt,
            enabled: config.enabled,
        }
    }

    pub fn is_exempt(&self, ip: &IpAddr) -> bool {
        self.exempt.contains(ip)
    }

    pub fn limit(&self) -> u64 {
        self.max_requests
    }
}

/// Middleware enforcing the per-address window.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let limiter = &state.limiter;
    if !limiter.enabled {
        return next.run(request).await;
    }

    let ip = addr.ip();
    if limiter.is_exempt(&ip) {
        return next.run(request).await;
    }

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|context| context.request_id);
    let debug = state.config.app.debug;

    let hit = match limiter.store.hit(&ip.to_string(), limiter.window).await {
        Ok(hit) => hit,
        Err(error) => {
            tracing::error!(client = %ip, error = %error, "Rate limit store failure");
            return ApiReply::internal("An unexpected error occurred.", error.to_string())
                .into_http(request_id, debug);
        }
    };

    if hit.count > limiter.max_requests {
        tracing::warn!(client = %ip, count = hit.count, "Rate limit exceeded");
        metrics::record_rate_limited();
        let meta = Meta {
            x_rate_limit_limit: Some(limiter.max_requests),
            x_rate_limit_remaining: Some(0),
            x_rate_limit_reset: Some(hit.reset_at_ms / 1000),
            ..Meta::default()
        };
        let mut response = ApiReply::error(
            ResponseKind::TooManyRequest,
            vec![ErrorDetail::new(
                "Too many requests, please try again later",
                "Too many requests from this IP, please try again later",
            )],
        )
        .with_meta(meta)
        .into_http(request_id, debug);
        set_rate_limit_headers(&mut response, limiter.max_requests, &hit);
        return response;
    }

    let mut response = next.run(request).await;
    set_rate_limit_headers(&mut response, limiter.max_requests, &hit);
    response
}

fn set_rate_limit_headers(response: &mut Response, limit: u64, hit: &WindowHit) {
    let remaining = limit.saturating_sub(hit.count);
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert("ratelimit-limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        headers.insert("ratelimit-remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&(hit.reset_at_ms / 1000).to_string()) {
        headers.insert("ratelimit-reset", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::counter::MemoryCounterStore;

    fn limiter(max: u64) -> RateLimiter {
        let config = RateLimitConfig {
            max_requests: max,
            ..RateLimitConfig::default()
        };
        RateLimiter::new(&config, Arc::new(MemoryCounterStore::new()))
    }

    #[test]
    fn loopback_addresses_are_exempt_by_default() {
        let limiter = limiter(50);
        assert!(limiter.is_exempt(&"127.0.0.1".parse().unwrap()));
        assert!(limiter.is_exempt(&"::1".parse().unwrap()));
        assert!(!limiter.is_exempt(&"203.0.113.9".parse().unwrap()));
    }

    #[tokio::test]
    async fn cap_is_inclusive() {
        let limiter = limiter(3);
        for _ in 0..3 {
            let hit = limiter.store.hit("203.0.113.9", limiter.window).await.unwrap();
            assert!(hit.count <= limiter.max_requests);
        }
        let over = limiter.store.hit("203.0.113.9", limiter.window).await.unwrap();
        assert!(over.count > limiter.max_requests);
    }
}
