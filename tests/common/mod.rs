//! Shared helpers for integration tests: an in-memory user repository and
//! a fully wired router that exercises the real middleware chain without
//! external backends.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use hydra_api::bus;
use hydra_api::config::AppConfig;
use hydra_api::http::server::{build_router, AppState};
use hydra_api::lifecycle::Shutdown;
use hydra_api::security::auth::AuthRecord;
use hydra_api::store::cache::{AuthCacheStore, MemoryAuthCache};
use hydra_api::store::counter::MemoryCounterStore;
use hydra_api::store::StoreError;
use hydra_api::users::model::{PublicUser, UserRow};
use hydra_api::users::service::{compose_phone, UserRepo};
use hydra_api::users::validator::{CreateUserData, FindUsersQuery, PatchUserData, UpdateUserData};

/// In-memory repository mirroring the relational semantics the routes rely
/// on: tag OR-substring search, closed created-at range, pagination, and
/// auth-cache invalidation on password change and delete.
pub struct MemUserRepo {
    rows: Mutex<Vec<UserRow>>,
    cache: Arc<dyn AuthCacheStore>,
    next_id: AtomicI32,
}

impl MemUserRepo {
    pub fn new(cache: Arc<dyn AuthCacheStore>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            cache,
            next_id: AtomicI32::new(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UserRow>> {
        self.rows.lock().expect("repo mutex poisoned")
    }

    fn matches_tags(row: &UserRow, tags: &[String]) -> bool {
        if tags.is_empty() {
            return true;
        }
        let fields = [
            &row.first_name,
            &row.last_name,
            &row.phone,
            &row.email,
            &row.organization_name,
            &row.organization_phone,
            &row.organization_email,
        ];
        tags.iter().any(|tag| {
            let tag = tag.to_lowercase();
            fields.iter().any(|field| {
                field
                    .as_ref()
                    .is_some_and(|value| value.to_lowercase().contains(&tag))
            })
        })
    }
}

#[async_trait]
impl UserRepo for MemUserRepo {
    async fn find(&self, query: &FindUsersQuery) -> Result<Vec<PublicUser>, StoreError> {
        let rows = self.lock();
        let records = rows
            .iter()
            .filter(|row| match query.range {
                Some((start, end)) => row.created_at >= start && row.created_at <= end,
                None => true,
            })
            .filter(|row| Self::matches_tags(row, &query.tags))
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .map(PublicUser::from)
            .collect();
        Ok(records)
    }

    async fn find_by_id(&self, uuid: Uuid) -> Result<Option<PublicUser>, StoreError> {
        let rows = self.lock();
        Ok(rows
            .iter()
            .find(|row| row.uuid == uuid)
            .map(PublicUser::from))
    }

    async fn create(
        &self,
        password: &str,
        salt: &str,
        data: &CreateUserData,
    ) -> Result<PublicUser, StoreError> {
        let now = Utc::now();
        let row = UserRow {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            uuid: Uuid::new_v4(),
            password: password.to_string(),
            salt: salt.to_string(),
            first_name: Some(data.first_name.clone()),
            last_name: Some(data.last_name.clone()),
            phone: compose_phone(Some(data.phone_country_code), Some(&data.phone)),
            email: Some(data.email.clone()),
            organization_name: Some(data.organization_name.clone()),
            organization_phone: compose_phone(
                Some(data.organization_phone_country_code),
                Some(&data.organization_phone),
            ),
            organization_email: Some(data.organization_email.clone()),
            created_at: now,
            updated_at: now,
        };
        let record = PublicUser::from(&row);
        self.lock().push(row);
        Ok(record)
    }

    async fn update(&self, data: &UpdateUserData) -> Result<(u64, Vec<PublicUser>), StoreError> {
        let mut rows = self.lock();
        let mut records = Vec::new();
        for row in rows.iter_mut().filter(|row| row.uuid == data.user_uuid) {
            row.first_name = data.first_name.clone();
            row.last_name = data.last_name.clone();
            row.phone = compose_phone(data.phone_country_code, data.phone.as_deref());
            row.email = data.email.clone();
            row.organization_name = data.organization_name.clone();
            row.organization_phone = compose_phone(
                data.organization_phone_country_code,
                data.organization_phone.as_deref(),
            );
            row.organization_email = data.organization_email.clone();
            row.updated_at = Utc::now();
            records.push(PublicUser::from(&*row));
        }
        Ok((records.len() as u64, records))
    }

    async fn patch(
        &self,
        data: &PatchUserData,
        password: Option<(&str, &str)>,
    ) -> Result<(u64, Vec<PublicUser>), StoreError> {
        let mut records = Vec::new();
        {
            let mut rows = self.lock();
            for row in rows.iter_mut().filter(|row| row.uuid == data.user_uuid) {
                if let Some(value) = &data.first_name {
                    row.first_name = Some(value.clone());
                }
                if let Some(value) = &data.last_name {
                    row.last_name = Some(value.clone());
                }
                if let Some(phone) = compose_phone(data.phone_country_code, data.phone.as_deref()) {
                    row.phone = Some(phone);
                }
                if let Some(value) = &data.email {
                    row.email = Some(value.clone());
                }
                if let Some(value) = &data.organization_name {
                    row.organization_name = Some(value.clone());
                }
                if let Some(phone) = compose_phone(
                    data.organization_phone_country_code,
                    data.organization_phone.as_deref(),
                ) {
                    row.organization_phone = Some(phone);
                }
                if let Some(value) = &data.organization_email {
                    row.organization_email = Some(value.clone());
                }
                if let Some((hash, salt)) = password {
                    row.password = hash.to_string();
                    row.salt = salt.to_string();
                }
                row.updated_at = Utc::now();
                records.push(PublicUser::from(&*row));
            }
        }
        let count = records.len() as u64;
        if password.is_some() && count > 0 {
            self.cache.delete(data.user_uuid).await?;
        }
        Ok((count, records))
    }

    async fn delete(&self, uuid: Uuid) -> Result<u64, StoreError> {
        let deleted = {
            let mut rows = self.lock();
            let before = rows.len();
            rows.retain(|row| row.uuid != uuid);
            (before - rows.len()) as u64
        };
        if deleted > 0 {
            self.cache.delete(uuid).await?;
        }
        Ok(deleted)
    }

    async fn find_credentials(&self, uuid: Uuid) -> Result<Option<AuthRecord>, StoreError> {
        let rows = self.lock();
        Ok(rows.iter().find(|row| row.uuid == uuid).map(|row| AuthRecord {
            id: row.id,
            uuid: row.uuid,
            password: row.password.clone(),
            salt: row.salt.clone(),
        }))
    }
}

/// Wired application plus handles the tests poke at directly.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemUserRepo>,
    pub cache: Arc<MemoryAuthCache>,
    // Keeps the bus worker alive for the test's lifetime.
    _shutdown: Shutdown,
}

/// Config suited to router tests: auth off, rate limiting off.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.mode = hydra_api::config::AuthMode::None;
    config.rate_limit.enabled = false;
    config
}

/// Build the full router over in-memory stores; `client` is the peer
/// address every request appears to come from.
pub fn build_app(config: AppConfig, client: SocketAddr) -> TestApp {
    let cache = Arc::new(MemoryAuthCache::new(Duration::from_secs(7 * 24 * 3600)));
    let repo = Arc::new(MemUserRepo::new(cache.clone()));
    let counters = Arc::new(MemoryCounterStore::new());

    let shutdown = Shutdown::new();
    let (bus, _worker) = bus::start(None, &shutdown);

    let state = AppState::new(config.clone(), repo.clone(), cache.clone(), counters, bus);
    let router = build_router(&config, state).layer(MockConnectInfo(client));

    TestApp {
        router,
        repo,
        cache,
        _shutdown: shutdown,
    }
}

pub fn remote_client() -> SocketAddr {
    "203.0.113.9:40000".parse().expect("valid test address")
}

pub fn loopback_client() -> SocketAddr {
    "127.0.0.1:40000".parse().expect("valid test address")
}

/// Issue one request against the app and return (status, parsed body).
pub async fn send(
    app: &Router,
    request: Request<Body>,
) -> (StatusCode, Value) {
    let response: Response<Body> = app
        .clone()
        .oneshot(request)
        .await
        .expect("infallible router");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("valid request")
}

pub fn json_request(method: &str, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// A complete, valid create payload.
pub fn create_payload(first: &str, last: &str, email: &str) -> Value {
    serde_json::json!({
        "firstName": first,
        "lastName": last,
        "phoneCountryCode": 44,
        "phone": "2071234567",
        "email": email,
        "password": "correct horse",
        "organizationName": "Analytical Engines",
        "organizationPhoneCountryCode": 44,
        "organizationPhone": "2079876543",
        "organizationEmail": "office@example.com"
    })
}
