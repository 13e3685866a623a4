//! User controllers: validator → service → envelope.
//!
//! Controllers own the operation messages and never let a store failure
//! escape as anything other than an InternalServerError envelope.

use serde_json::json;

use crate::bus::UserEvent;
use crate::http::response::{ApiReply, ErrorDetail, ResponseKind};
use crate::http::server::AppState;
use crate::security::crypto;
use crate::users::model::{FindUsersParams, UserPayload};
use crate::users::validator;

/// List users matching the query filters.
pub async fn find_users(state: &AppState, params: FindUsersParams) -> ApiReply {
    let query = match validator::validate_find(&params) {
        Ok(query) => query,
        Err(reply) => return reply,
    };

    match state.users.find(&query).await {
        Ok(records) => {
            let message = if records.is_empty() {
                "No record found."
            } else {
                "User data found."
            };
            ApiReply::ok(
                message,
                json!({ "count": records.len(), "records": records }),
            )
        }
        Err(error) => ApiReply::internal("An unexpected error occurred.", error.to_string()),
    }
}

/// Fetch one user by external identifier.
pub async fn find_user_by_id(state: &AppState, user_id: &str) -> ApiReply {
    let uuid = match validator::validate_user_id(user_id) {
        Ok(uuid) => uuid,
        Err(reply) => return reply,
    };

    match state.users.find_by_id(uuid).await {
        Ok(Some(record)) => ApiReply::ok(
            "User details found.",
            json!({ "count": 1, "records": [record] }),
        ),
        Ok(None) => ApiReply::error(
            ResponseKind::BadRequest,
            vec![ErrorDetail::new("No user details found.", "No user record found.")],
        ),
        Err(error) => ApiReply::internal("An unexpected error occurred.", error.to_string()),
    }
}

/// Create a user; publishes the verification-mail event on success.
pub async fn create_user(state: &AppState, payload: UserPayload) -> ApiReply {
    let data = match validator::validate_create(&payload) {
        Ok(data) => data,
        Err(reply) => return reply,
    };

    let salt = crypto::generate_salt();
    let digest = crypto::hash(state.hash_algo, &data.password, &salt);

    match state.users.create(&digest, &salt, &data).await {
        Ok(record) => {
            state.bus.publish(UserEvent::SendVerificationEmail {
                first_name: data.first_name.clone(),
                last_name: data.last_name.clone(),
                user_uuid: record.user_id,
                email: data.email.clone(),
            });
            ApiReply::ok(
                "User details saved successfully.",
                json!({ "count": 1, "records": [record] }),
            )
        }
        Err(error) => ApiReply::internal("An unexpected error occurred.", error.to_string()),
    }
}

/// Replace every addressed field of a user.
pub async fn update_user(state: &AppState, user_id: &str, payload: UserPayload) -> ApiReply {
    let data = match validator::validate_update(user_id, &payload) {
        Ok(data) => data,
        Err(reply) => return reply,
    };

    match state.users.update(&data).await {
        Ok((count, records)) => ApiReply::ok(
            "User details updated successfully.",
            json!({ "count": count, "records": records }),
        ),
        Err(error) => ApiReply::internal("An unexpected error occurred.", error.to_string()),
    }
}

/// Update only the supplied fields; a password change re-salts the digest.
pub async fn patch_user(state: &AppState, user_id: &str, payload: UserPayload) -> ApiReply {
    let data = match validator::validate_patch(user_id, &payload) {
        Ok(data) => data,
        Err(reply) => return reply,
    };

    let credentials = data.password.as_ref().map(|password| {
        let salt = crypto::generate_salt();
        let digest = crypto::hash(state.hash_algo, password, &salt);
        (digest, salt)
    });
    let password = credentials
        .as_ref()
        .map(|(digest, salt)| (digest.as_str(), salt.as_str()));

    match state.users.patch(&data, password).await {
        Ok((count, records)) => ApiReply::ok(
            "User details updated successfully.",
            json!({ "count": count, "records": records }),
        ),
        Err(error) => ApiReply::internal("An unexpected error occurred.", error.to_string()),
    }
}

/// Hard-delete a user.
pub async fn delete_user(state: &AppState, user_id: &str) -> ApiReply {
    let uuid = match validator::validate_user_id(user_id) {
        Ok(uuid) => uuid,
        Err(reply) => return reply,
    };

    match state.users.delete(uuid).await {
        Ok(count) => {
            let message = if count > 0 {
                "User details deleted successfully."
            } else {
                "User details not exist."
            };
            ApiReply::ok(message, json!({ "count": count, "records": [] }))
        }
        Err(error) => ApiReply::internal("An unexpected error occurred.", error.to_string()),
    }
}
