//! HTTP bindings of the user module.
//!
//! Explicit route registry: verbs and paths bind to controller functions
//! here and are nested under `/api/v1/users` by the server.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};

use crate::http::request::RequestContext;
use crate::http::response::{ApiReply, ErrorDetail};
use crate::http::server::AppState;
use crate::users::controller;
use crate::users::model::{FindUsersParams, UserPayload};

/// Router for the users module, nested at the versioned API prefix.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{user_id}",
            get(find_user_by_id)
                .put(update_user)
                .patch(patch_user)
                .delete(delete_user),
        )
}

fn render(reply: ApiReply, context: &RequestContext, state: &AppState) -> Response {
    reply.into_http(Some(context.request_id), state.config.app.debug)
}

fn rejected(reason: impl std::fmt::Display) -> ApiReply {
    ApiReply::bad_request(vec![ErrorDetail::new(
        "Invalid data provided",
        reason.to_string(),
    )])
}

/// List users with optional filters and pagination.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(FindUsersParams),
    responses(
        (status = 200, description = "Matching user records in an envelope"),
        (status = 400, description = "Validation failure envelope"),
        (status = 401, description = "Authentication failure envelope")
    )
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    context: RequestContext,
    params: Result<Query<FindUsersParams>, QueryRejection>,
) -> Response {
    let reply = match params {
        Ok(Query(params)) => controller::find_users(&state, params).await,
        Err(rejection) => rejected(rejection.body_text()),
    };
    render(reply, &context, &state)
}

/// Fetch a single user.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "External user identifier")),
    responses(
        (status = 200, description = "User record envelope"),
        (status = 400, description = "Unknown identifier envelope"),
        (status = 401, description = "Authentication failure envelope")
    )
)]
pub(crate) async fn find_user_by_id(
    State(state): State<AppState>,
    context: RequestContext,
    Path(user_id): Path<String>,
) -> Response {
    let reply = controller::find_user_by_id(&state, &user_id).await;
    render(reply, &context, &state)
}

/// Register a new user.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = UserPayload,
    responses(
        (status = 200, description = "Created user envelope"),
        (status = 400, description = "Validation failure envelope")
    )
)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    context: RequestContext,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Response {
    let reply = match payload {
        Ok(Json(payload)) => controller::create_user(&state, payload).await,
        Err(rejection) => rejected(rejection.body_text()),
    };
    render(reply, &context, &state)
}

/// Replace all fields of a user.
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "External user identifier")),
    request_body = UserPayload,
    responses(
        (status = 200, description = "Updated user envelope"),
        (status = 400, description = "Validation failure envelope"),
        (status = 401, description = "Authentication failure envelope")
    )
)]
pub(crate) async fn update_user(
    State(state): State<AppState>,
    context: RequestContext,
    Path(user_id): Path<String>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Response {
    let reply = match payload {
        Ok(Json(payload)) => controller::update_user(&state, &user_id, payload).await,
        Err(rejection) => rejected(rejection.body_text()),
    };
    render(reply, &context, &state)
}

/// Update supplied fields of a user.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "External user identifier")),
    request_body = UserPayload,
    responses(
        (status = 200, description = "Updated user envelope"),
        (status = 400, description = "Validation failure envelope"),
        (status = 401, description = "Authentication failure envelope")
    )
)]
pub(crate) async fn patch_user(
    State(state): State<AppState>,
    context: RequestContext,
    Path(user_id): Path<String>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Response {
    let reply = match payload {
        Ok(Json(payload)) => controller::patch_user(&state, &user_id, payload).await,
        Err(rejection) => rejected(rejection.body_text()),
    };
    render(reply, &context, &state)
}

/// Delete a user.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "External user identifier")),
    responses(
        (status = 200, description = "Deletion envelope with affected count"),
        (status = 400, description = "Unknown identifier envelope"),
        (status = 401, description = "Authentication failure envelope")
    )
)]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    context: RequestContext,
    Path(user_id): Path<String>,
) -> Response {
    let reply = controller::delete_user(&state, &user_id).await;
    render(reply, &context, &state)
}
