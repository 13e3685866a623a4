//! Fixed-window rate limiting through the full middleware chain.

use axum::http::StatusCode;

mod common;
use common::{build_app, get, loopback_client, remote_client, send, test_config};
use hydra_api::config::AppConfig;

fn limited_config(max_requests: u64) -> AppConfig {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.window_secs = 60;
    config
}

#[tokio::test]
async fn the_cap_is_inclusive_and_the_next_request_is_rejected() {
    let app = build_app(limited_config(50), remote_client());

    for attempt in 1..=50u32 {
        let (status, _) = send(&app.router, get("/health-check")).await;
        assert_eq!(status, StatusCode::OK, "request {attempt} should pass");
    }

    let (status, body) = send(&app.router, get("/health-check")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["meta"]["responseType"], "TooManyRequest");
    assert_eq!(body["message"], "Too many requests, please try again later");
    assert_eq!(body["meta"]["xRateLimitLimit"], 50);
    assert_eq!(body["meta"]["xRateLimitRemaining"], 0);
    assert!(body["meta"]["xRateLimitReset"].is_u64());
}

#[tokio::test]
async fn loopback_clients_are_never_limited() {
    let app = build_app(limited_config(3), loopback_client());
    for _ in 0..20 {
        let (status, _) = send(&app.router, get("/health-check")).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn rejections_keep_the_envelope_shape() {
    let app = build_app(limited_config(1), remote_client());
    let (status, _) = send(&app.router, get("/health-check")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app.router, get("/health-check")).await;
    // Error branch only: empty data, populated errors.
    assert!(body["data"].as_object().unwrap().is_empty());
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert!(body["meta"]["requestId"].is_string());
}

#[tokio::test]
async fn allowed_responses_carry_rate_limit_headers() {
    let app = build_app(limited_config(10), remote_client());
    use tower::ServiceExt;
    let response = app
        .router
        .clone()
        .oneshot(get("/health-check"))
        .await
        .unwrap();
    assert_eq!(response.headers().get("ratelimit-limit").unwrap(), "10");
    assert_eq!(response.headers().get("ratelimit-remaining").unwrap(), "9");
}

#[tokio::test]
async fn disabled_limiter_passes_everything() {
    let app = build_app(test_config(), remote_client());
    for _ in 0..60 {
        let (status, _) = send(&app.router, get("/health-check")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
