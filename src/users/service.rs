//! User persistence operations.
//!
//! Each method performs exactly one persistence action. Implementations
//! never panic across this boundary; failures surface as [`StoreError`]
//! and are converted to envelopes by the controller layer.
//!
//! Auth-cache invariants owned here:
//! - `patch` with a password change deletes the cached credential entry
//!   for that user when at least one row was touched
//! - `delete` removes the cached entry when the row existed

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::security::auth::AuthRecord;
use crate::store::cache::AuthCacheStore;
use crate::store::StoreError;
use crate::users::model::PublicUser;
use crate::users::validator::{CreateUserData, FindUsersQuery, PatchUserData, UpdateUserData};

/// Columns of the client-facing projection, aliased for [`PublicUser`].
const SELECT_PUBLIC: &str = "uuid AS user_id, first_name, last_name, phone, email, \
     organization_name, organization_phone, organization_email";

/// Text columns searched by the tag filter.
const TAG_COLUMNS: [&str; 7] = [
    "first_name",
    "last_name",
    "phone",
    "email",
    "organization_name",
    "organization_phone",
    "organization_email",
];

/// Store `+<country code> <digits>` only when both parts are present.
pub fn compose_phone(country_code: Option<i64>, digits: Option<&str>) -> Option<String> {
    match (country_code, digits) {
        (Some(code), Some(digits)) => Some(format!("+{code} {digits}")),
        _ => None,
    }
}

/// Repository of user records.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// List users matching the validated filter.
    async fn find(&self, query: &FindUsersQuery) -> Result<Vec<PublicUser>, StoreError>;

    /// Fetch one user by external identifier.
    async fn find_by_id(&self, uuid: Uuid) -> Result<Option<PublicUser>, StoreError>;

    /// Insert a new user with a pre-hashed password.
    async fn create(
        &self,
        password: &str,
        salt: &str,
        data: &CreateUserData,
    ) -> Result<PublicUser, StoreError>;

    /// Replace every addressed column (absent values write NULL).
    async fn update(&self, data: &UpdateUserData) -> Result<(u64, Vec<PublicUser>), StoreError>;

    /// Update only the supplied columns. `password` carries the new
    /// `(hash, salt)` pair when the password changes.
    async fn patch(
        &self,
        data: &PatchUserData,
        password: Option<(&str, &str)>,
    ) -> Result<(u64, Vec<PublicUser>), StoreError>;

    /// Hard-delete by external identifier; returns rows removed.
    async fn delete(&self, uuid: Uuid) -> Result<u64, StoreError>;

    /// Credential subset used by basic auth.
    async fn find_credentials(&self, uuid: Uuid) -> Result<Option<AuthRecord>, StoreError>;
}

/// PostgreSQL-backed repository.
pub struct PgUserRepo {
    pool: PgPool,
    cache: Arc<dyn AuthCacheStore>,
}

impl PgUserRepo {
    pub fn new(pool: PgPool, cache: Arc<dyn AuthCacheStore>) -> Self {
        Self { pool, cache }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find(&self, query: &FindUsersQuery) -> Result<Vec<PublicUser>, StoreError> {
        let mut builder =
            QueryBuilder::<sqlx::Postgres>::new(format!("SELECT {SELECT_PUBLIC} FROM users"));
        let mut has_where = false;

        if let Some((start, end)) = query.range {
            builder.push(" WHERE created_at BETWEEN ");
            builder.push_bind(start);
            builder.push(" AND ");
            builder.push_bind(end);
            has_where = true;
        }

        if !query.tags.is_empty() {
            builder.push(if has_where { " AND (" } else { " WHERE (" });
            for (tag_index, tag) in query.tags.iter().enumerate() {
                if tag_index > 0 {
                    builder.push(" OR ");
                }
                let pattern = format!("%{tag}%");
                builder.push("(");
                for (column_index, column) in TAG_COLUMNS.iter().enumerate() {
                    if column_index > 0 {
                        builder.push(" OR ");
                    }
                    builder.push(format!("{column} ILIKE "));
                    builder.push_bind(pattern.clone());
                }
                builder.push(")");
            }
            builder.push(")");
        }

        builder.push(" ORDER BY id");
        if query.offset > 0 {
            builder.push(" OFFSET ");
            builder.push_bind(query.offset);
        }
        if query.limit > 0 {
            builder.push(" LIMIT ");
            builder.push_bind(query.limit);
        }

        let records = builder
            .build_query_as::<PublicUser>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn find_by_id(&self, uuid: Uuid) -> Result<Option<PublicUser>, StoreError> {
        let record = sqlx::query_as::<_, PublicUser>(&format!(
            "SELECT {SELECT_PUBLIC} FROM users WHERE uuid = $1"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn create(
        &self,
        password: &str,
        salt: &str,
        data: &CreateUserData,
    ) -> Result<PublicUser, StoreError> {
        let record = sqlx::query_as::<_, PublicUser>(&format!(
            "INSERT INTO users (uuid, password, salt, first_name, last_name, phone, email, \
             organization_name, organization_phone, organization_email) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {SELECT_PUBLIC}"
        ))
        .bind(Uuid::new_v4())
        .bind(password)
        .bind(salt)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(compose_phone(Some(data.phone_country_code), Some(&data.phone)))
        .bind(&data.email)
        .bind(&data.organization_name)
        .bind(compose_phone(
            Some(data.organization_phone_country_code),
            Some(&data.organization_phone),
        ))
        .bind(&data.organization_email)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update(&self, data: &UpdateUserData) -> Result<(u64, Vec<PublicUser>), StoreError> {
        let records = sqlx::query_as::<_, PublicUser>(&format!(
            "UPDATE users SET first_name = $1, last_name = $2, phone = $3, email = $4, \
             organization_name = $5, organization_phone = $6, organization_email = $7, \
             updated_at = now() WHERE uuid = $8 RETURNING {SELECT_PUBLIC}"
        ))
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(compose_phone(data.phone_country_code, data.phone.as_deref()))
        .bind(&data.email)
        .bind(&data.organization_name)
        .bind(compose_phone(
            data.organization_phone_country_code,
            data.organization_phone.as_deref(),
        ))
        .bind(&data.organization_email)
        .bind(data.user_uuid)
        .fetch_all(&self.pool)
        .await?;
        Ok((records.len() as u64, records))
    }

    async fn patch(
        &self,
        data: &PatchUserData,
        password: Option<(&str, &str)>,
    ) -> Result<(u64, Vec<PublicUser>), StoreError> {
        let mut builder = QueryBuilder::<sqlx::Postgres>::new("UPDATE users SET updated_at = now()");

        if let Some(value) = &data.first_name {
            builder.push(", first_name = ");
            builder.push_bind(value.clone());
        }
        if let Some(value) = &data.last_name {
            builder.push(", last_name = ");
            builder.push_bind(value.clone());
        }
        if let Some(phone) = compose_phone(data.phone_country_code, data.phone.as_deref()) {
            builder.push(", phone = ");
            builder.push_bind(phone);
        }
        if let Some(value) = &data.email {
            builder.push(", email = ");
            builder.push_bind(value.clone());
        }
        if let Some(value) = &data.organization_name {
            builder.push(", organization_name = ");
            builder.push_bind(value.clone());
        }
        if let Some(phone) = compose_phone(
            data.organization_phone_country_code,
            data.organization_phone.as_deref(),
        ) {
            builder.push(", organization_phone = ");
            builder.push_bind(phone);
        }
        if let Some(value) = &data.organization_email {
            builder.push(", organization_email = ");
            builder.push_bind(value.clone());
        }
        if let Some((hash, salt)) = password {
            builder.push(", password = ");
            builder.push_bind(hash.to_string());
            builder.push(", salt = ");
            builder.push_bind(salt.to_string());
        }

        builder.push(" WHERE uuid = ");
        builder.push_bind(data.user_uuid);
        builder.push(format!(" RETURNING {SELECT_PUBLIC}"));

        let records = builder
            .build_query_as::<PublicUser>()
            .fetch_all(&self.pool)
            .await?;
        let count = records.len() as u64;

        if password.is_some() && count > 0 {
            self.cache.delete(data.user_uuid).await?;
        }
        Ok((count, records))
    }

    async fn delete(&self, uuid: Uuid) -> Result<u64, StoreError> {
        let deleted = sqlx::query("DELETE FROM users WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            self.cache.delete(uuid).await?;
        }
        Ok(deleted)
    }

    async fn find_credentials(&self, uuid: Uuid) -> Result<Option<AuthRecord>, StoreError> {
        let record = sqlx::query_as::<_, AuthRecord>(
            "SELECT id, uuid, password, salt FROM users WHERE uuid = $1",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}
