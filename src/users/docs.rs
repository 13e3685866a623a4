//! OpenAPI document for the user endpoints.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::http::server::AppState;
use crate::users::model::{PublicUser, UserPayload};

/// Assembled API description, served under `/api-docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "hydra-api",
        description = "Boilerplate REST API service: users CRUD with uniform \
                       response envelopes, auth and rate limiting."
    ),
    paths(
        crate::users::router::list_users,
        crate::users::router::find_user_by_id,
        crate::users::router::create_user,
        crate::users::router::update_user,
        crate::users::router::patch_user,
        crate::users::router::delete_user,
    ),
    components(schemas(PublicUser, UserPayload)),
    tags((name = "users", description = "User record management"))
)]
pub struct ApiDoc;

/// Routes serving the generated document.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api-docs", get(openapi_json))
        .route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
