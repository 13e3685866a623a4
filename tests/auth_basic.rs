//! Basic-auth middleware behavior: allow-list bypass, credential checks,
//! and the no-existence-leak guarantee.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use uuid::Uuid;

mod common;
use common::{build_app, create_payload, json_request, remote_client, send, test_config, TestApp};
use hydra_api::config::{AppConfig, AuthMode};

fn basic_config() -> AppConfig {
    let mut config = test_config();
    config.auth.mode = AuthMode::Basic;
    config
}

fn authed_get(path: &str, username: &str, password: &str) -> Request<Body> {
    let token = BASE64.encode(format!("{username}:{password}"));
    Request::builder()
        .method("GET")
        .uri(path)
        .header(header::AUTHORIZATION, format!("Basic {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Register a user through the open create route; returns its external ID.
async fn register(app: &TestApp) -> String {
    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/v1/users",
            create_payload("Ada", "Lovelace", "ada@example.com"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["records"][0]["userId"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn open_routes_bypass_authentication() {
    let app = build_app(basic_config(), remote_client());

    for path in ["/", "/health-check", "/vitals"] {
        let (status, _) = send(
            &app.router,
            Request::builder().uri(path).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{path} should be open");
    }

    // User registration is open by design.
    register(&app).await;
}

#[tokio::test]
async fn missing_header_is_unauthorized() {
    let app = build_app(basic_config(), remote_client());
    let (status, body) = send(
        &app.router,
        Request::builder()
            .uri("/api/v1/users")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["meta"]["responseType"], "Unauthorized");
    assert_eq!(body["message"], "Missing authorization header.");
}

#[tokio::test]
async fn unknown_user_and_wrong_password_are_indistinguishable() {
    let app = build_app(basic_config(), remote_client());
    let user_id = register(&app).await;

    // Existing user, wrong password.
    let (status, wrong_password) = send(
        &app.router,
        authed_get("/api/v1/users", &user_id, "not the password"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Username that has never existed.
    let ghost = Uuid::new_v4().to_string();
    let (status, unknown_user) = send(
        &app.router,
        authed_get("/api/v1/users", &ghost, "whatever"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Same client-facing message: no account-existence oracle.
    assert_eq!(wrong_password["message"], "Invalid authentication credentials.");
    assert_eq!(wrong_password["message"], unknown_user["message"]);
    assert_eq!(
        strip_meta(wrong_password.clone()),
        strip_meta(unknown_user.clone())
    );
    // And no reason leaks without the debug flag.
    assert!(wrong_password["errors"][0].get("reason").is_none());
}

#[tokio::test]
async fn malformed_usernames_are_rejected_with_the_generic_message() {
    let app = build_app(basic_config(), remote_client());
    let (status, body) = send(
        &app.router,
        authed_get("/api/v1/users", "not-a-uuid", "password"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid authentication credentials.");

    let (status, body) = send(
        &app.router,
        authed_get("/api/v1/users", &Uuid::new_v4().to_string(), ""),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid authentication credentials.");
}

#[tokio::test]
async fn correct_credentials_pass_and_reach_the_controller() {
    let app = build_app(basic_config(), remote_client());
    let user_id = register(&app).await;

    let (status, body) = send(
        &app.router,
        authed_get(&format!("/api/v1/users/{user_id}"), &user_id, "correct horse"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User details found.");
    assert_eq!(body["data"]["records"][0]["firstName"], "Ada");
}

#[tokio::test]
async fn lookups_populate_the_auth_cache_once() {
    use hydra_api::store::cache::AuthCacheStore;

    let app = build_app(basic_config(), remote_client());
    let user_id = register(&app).await;
    let uuid = Uuid::parse_str(&user_id).unwrap();
    assert!(app.cache.get(uuid).await.unwrap().is_none());

    let (status, _) = send(
        &app.router,
        authed_get("/api/v1/users", &user_id, "correct horse"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The miss populated the cache with the credential subset.
    let cached = app.cache.get(uuid).await.unwrap().unwrap();
    assert_eq!(cached.uuid, uuid);
    assert!(!cached.password.is_empty());
    assert!(!cached.salt.is_empty());
}

#[tokio::test]
async fn bad_passwords_still_fail_after_cache_population() {
    let app = build_app(basic_config(), remote_client());
    let user_id = register(&app).await;

    // First lookup caches the credentials.
    let (status, _) = send(
        &app.router,
        authed_get("/api/v1/users", &user_id, "correct horse"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Cached path must verify the digest just the same.
    let (status, _) = send(
        &app.router,
        authed_get("/api/v1/users", &user_id, "wrong"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_mode_rejects_missing_tokens() {
    let mut config = test_config();
    config.auth.mode = AuthMode::Bearer;
    config.auth.auth_uri = "http://127.0.0.1:9".to_string();
    let app = build_app(config, remote_client());

    let (status, body) = send(
        &app.router,
        Request::builder()
            .uri("/api/v1/users")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing authorization header.");
}

fn strip_meta(mut body: Value) -> Value {
    body.as_object_mut().unwrap().remove("meta");
    body
}
