//! Bearer-token verification against a remote key set.
//!
//! Keys are published by the issuer at `<auth_uri>/.well-known/jwks.json`
//! and cached in-process. A refresh happens when the cache expires or a
//! token references an unknown key ID, bounded by a minimum interval so a
//! flood of bad tokens cannot hammer the issuer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::schema::AuthConfig;

/// Claims extracted from a verified token.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub exp: Option<u64>,
}

/// Token verification failure, reported as an Unauthorized reason.
#[derive(Debug, thiserror::Error)]
pub enum BearerError {
    #[error("Missing authorization header.")]
    MissingHeader,
    #[error("Authorization header is not a bearer token.")]
    NotBearer,
    #[error("Token verification failed: {0}")]
    Verification(#[from] jsonwebtoken::errors::Error),
    #[error("No signing key matches the token.")]
    UnknownKey,
    #[error("Failed to fetch signing keys: {0}")]
    Fetch(#[from] reqwest::Error),
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
}

/// Remote JWKS client with a TTL cache and fetch rate limiting.
pub struct JwksClient {
    http: reqwest::Client,
    jwks_url: String,
    cache_ttl: Duration,
    min_fetch_interval: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl JwksClient {
    pub fn new(config: &AuthConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.jwks_timeout_secs))
            .build()
            .unwrap_or_default();
        let per_minute = config.jwks_requests_per_minute.max(1);
        Self {
            http,
            jwks_url: format!("{}/.well-known/jwks.json", config.auth_uri.trim_end_matches('/')),
            cache_ttl: Duration::from_secs(config.jwks_cache_secs),
            min_fetch_interval: Duration::from_secs(60) / per_minute,
            cache: RwLock::new(None),
        }
    }

    /// Find the decoding key for `kid`, refreshing the set when it is
    /// stale or the key is unknown.
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, BearerError> {
        if let Some(key) = self.lookup_cached(kid).await? {
            return Ok(key);
        }
        self.refresh().await?;
        match self.lookup_cached(kid).await? {
            Some(key) => Ok(key),
            None => Err(BearerError::UnknownKey),
        }
    }

    async fn lookup_cached(&self, kid: Option<&str>) -> Result<Option<DecodingKey>, BearerError> {
        let guard = self.cache.read().await;
        let Some(cached) = guard.as_ref() else {
            return Ok(None);
        };
        if cached.fetched_at.elapsed() > self.cache_ttl {
            return Ok(None);
        }
        match find_key(&cached.set, kid) {
            Some(jwk) => Ok(Some(DecodingKey::from_jwk(jwk)?)),
            None => Ok(None),
        }
    }

    async fn refresh(&self) -> Result<(), BearerError> {
        let mut guard = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock,
        // and failed verifications must not trigger unbounded refetching.
        if let Some(cached) = guard.as_ref() {
            if cached.fetched_at.elapsed() < self.min_fetch_interval {
                return Ok(());
            }
        }
        let set: JwkSet = self
            .http
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::debug!(url = %self.jwks_url, keys = set.keys.len(), "JWKS refreshed");
        *guard = Some(CachedKeys {
            set,
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}

fn find_key<'s>(set: &'s JwkSet, kid: Option<&str>) -> Option<&'s Jwk> {
    match kid {
        Some(kid) => set.find(kid),
        // Tokens without a key ID verify against the sole published key.
        None => set.keys.first(),
    }
}

/// Verifies bearer tokens scoped to this deployment's issuer, audience
/// and subject.
pub struct BearerVerifier {
    jwks: Arc<JwksClient>,
    validation: Validation,
}

impl BearerVerifier {
    pub fn new(config: &AuthConfig, app_name: &str) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[config.host.clone()]);
        validation.set_audience(&[config.host.clone()]);
        validation.sub = Some(app_name.to_string());
        Self {
            jwks: Arc::new(JwksClient::new(config)),
            validation,
        }
    }

    /// Verify a raw token and return its claims.
    pub async fn verify(&self, token: &str) -> Result<Claims, BearerError> {
        let header = decode_header(token)?;
        let key = self.jwks.decoding_key(header.kid.as_deref()).await?;
        let data = decode::<Claims>(token, &key, &self.validation)?;
        Ok(data.claims)
    }
}
