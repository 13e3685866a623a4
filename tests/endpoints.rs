//! Probe routes, routing fallbacks and header validation through the full
//! middleware chain.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

mod common;
use common::{build_app, get, remote_client, send, test_config};

#[tokio::test]
async fn root_returns_banner_with_powered_by_header() {
    let app = build_app(test_config(), remote_client());

    let response = app.router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-powered-by").unwrap(),
        "HYDRA"
    );
}

#[tokio::test]
async fn health_check_says_ok() {
    let app = build_app(test_config(), remote_client());
    let (status, body) = send(&app.router, get("/health-check")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn vitals_reports_process_stats() {
    let app = build_app(test_config(), remote_client());
    let (status, body) = send(&app.router, get("/vitals")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
    assert!(body["uptime"].as_str().unwrap().contains("second"));
    assert!(body["total_requests"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn unknown_route_gets_not_found_envelope() {
    let app = build_app(test_config(), remote_client());
    let (status, body) = send(&app.router, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["meta"]["responseType"], "NotFound");
    assert_eq!(body["message"], "Resource not found");
    assert!(body["meta"]["requestId"].is_string());
}

#[tokio::test]
async fn wrong_method_gets_method_not_allowed_envelope() {
    let app = build_app(test_config(), remote_client());
    let request = Request::builder()
        .method("POST")
        .uri("/health-check")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["meta"]["responseType"], "MethodNotAllowed");
}

#[tokio::test]
async fn api_routes_validate_constrained_headers() {
    let app = build_app(test_config(), remote_client());

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/users")
        .header("x-language", "fr")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request headers");

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/users")
        .header("x-time-zone", "+24:00")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Valid headers pass through to the handler.
    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/users")
        .header("x-language", "en")
        .header("x-time-zone", "+05:30")
        .header("x-timestamp", "1656230400000")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn probe_routes_skip_header_validation() {
    let app = build_app(test_config(), remote_client());
    let request = Request::builder()
        .method("GET")
        .uri("/health-check")
        .header("x-language", "fr")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn error_reasons_are_hidden_without_debug() {
    let app = build_app(test_config(), remote_client());
    let (_, body) = send(&app.router, get("/nope")).await;
    assert!(body["errors"][0].get("reason").is_none());

    let mut config = test_config();
    config.app.debug = true;
    let app = build_app(config, remote_client());
    let (_, body) = send(&app.router, get("/nope")).await;
    assert_eq!(
        body["errors"][0]["reason"],
        "No route matches the requested path"
    );
}

#[tokio::test]
async fn responses_carry_a_request_id_header() {
    let app = build_app(test_config(), remote_client());
    let response = app
        .router
        .clone()
        .oneshot(get("/health-check"))
        .await
        .unwrap();
    let header = response.headers().get("x-request-id").unwrap();
    assert!(uuid::Uuid::parse_str(header.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = build_app(test_config(), remote_client());
    let (status, body) = send(&app.router, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/users"].is_object());
}
