//! User record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Full relational row. `id` is internal only; `uuid` is the externally
/// visible identifier.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i32,
    pub uuid: Uuid,
    pub password: String,
    pub salt: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub organization_name: Option<String>,
    pub organization_phone: Option<String>,
    pub organization_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-facing projection of a user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// External identifier (the row uuid).
    pub user_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub organization_name: Option<String>,
    pub organization_phone: Option<String>,
    pub organization_email: Option<String>,
}

impl From<&UserRow> for PublicUser {
    fn from(row: &UserRow) -> Self {
        Self {
            user_id: row.uuid,
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            phone: row.phone.clone(),
            email: row.email.clone(),
            organization_name: row.organization_name.clone(),
            organization_phone: row.organization_phone.clone(),
            organization_email: row.organization_email.clone(),
        }
    }
}

/// Raw body payload for create, update and patch operations. Validation
/// decides which fields are required per operation.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_country_code: Option<i64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub organization_name: Option<String>,
    pub organization_phone_country_code: Option<i64>,
    pub organization_phone: Option<String>,
    pub organization_email: Option<String>,
}

/// Raw query parameters of the list operation.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase", default)]
pub struct FindUsersParams {
    /// Comma-separated search tags.
    pub tags: Option<String>,
    /// Inclusive range start (RFC3339); paired with the end bound.
    pub start_time_stamp_tz: Option<String>,
    /// Inclusive range end (RFC3339); paired with the start bound.
    pub end_time_stamp_tz: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}
