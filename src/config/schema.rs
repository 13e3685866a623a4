//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API
//! service. All types derive Serde traits for deserialization from config
//! files; every section has defaults so a minimal config is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for the API service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Application identity (name, environment, debug flag).
    pub app: AppSection,

    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// HTTP pipeline knobs (body limit, timeouts).
    pub http: HttpConfig,

    /// Authentication mode and token verification settings.
    pub auth: AuthConfig,

    /// Relational store connection settings.
    pub sql: SqlConfig,

    /// Auth cache (key-value store) settings.
    pub auth_cache: AuthCacheConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Outbound SMTP settings for the mail worker.
    pub smtp: SmtpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Application identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppSection {
    /// Application name, used as the X-Powered-By value and token subject.
    pub name: String,

    /// Deployment environment (local, development, testing, staging, production).
    pub environment: String,

    /// When true, error envelopes carry the `reason` field.
    pub debug: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "hydra".to_string(),
            environment: "local".to_string(),
            debug: false,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// HTTP pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Artificial delay of the `/long-response` probe in seconds.
    pub long_response_delay_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 5 * 1024 * 1024, // 5MB
            request_timeout_secs: 60,
            long_response_delay_secs: 30,
        }
    }
}

/// Authentication mode, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Signed-token verification against a remote JWKS document.
    Bearer,
    /// Base64 credential pairs checked against stored password hashes.
    Basic,
    /// No authentication (open service).
    #[default]
    None,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Selected mode. Applies to every route not on the allow-list.
    pub mode: AuthMode,

    /// Base URI of the token issuer; the JWKS document is fetched from
    /// `<auth_uri>/.well-known/jwks.json`.
    pub auth_uri: String,

    /// Expected `iss` and `aud` claim value.
    pub host: String,

    /// JWKS fetch timeout in seconds.
    pub jwks_timeout_secs: u64,

    /// How long fetched keys stay valid before a refresh, in seconds.
    pub jwks_cache_secs: u64,

    /// Maximum JWKS fetches per minute.
    pub jwks_requests_per_minute: u32,

    /// Password hash algorithm (sha256 or sha512).
    pub hash_algo: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::None,
            auth_uri: String::new(),
            host: "localhost".to_string(),
            jwks_timeout_secs: 30,
            jwks_cache_secs: 600,
            jwks_requests_per_minute: 5,
            hash_algo: "sha256".to_string(),
        }
    }
}

/// Relational store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Connection URL (overridable via DATABASE_URL).
    pub url: String,

    /// Maximum pool connections.
    pub max_connections: u32,

    /// Connection acquire timeout in seconds.
    pub acquire_timeout_secs: u64,

    /// Idle connection reap timeout in seconds.
    pub idle_timeout_secs: u64,

    /// Run embedded migrations at startup.
    pub run_migrations: bool,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/hydra".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 3,
            idle_timeout_secs: 60,
            run_migrations: false,
        }
    }
}

/// Auth cache configuration (key-value store db0).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthCacheConfig {
    /// Redis connection URL (overridable via CACHE_REDIS_URL).
    pub url: String,

    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,
}

impl Default for AuthCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            ttl_secs: 60 * 60 * 24 * 7, // 7 days
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Counter store connection URL (overridable via RATE_LIMIT_REDIS_URL).
    pub url: String,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Maximum requests per window per client address.
    pub max_requests: u64,

    /// Client addresses exempt from limiting.
    pub exempt_ips: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "redis://127.0.0.1:6379/1".to_string(),
            window_secs: 60,
            max_requests: 50,
            exempt_ips: vec!["127.0.0.1".to_string(), "::1".to_string()],
        }
    }
}

/// Outbound SMTP configuration. Mail is disabled when `host` is empty.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// SMTP relay host.
    pub host: String,

    /// SMTP relay port.
    pub port: u16,

    /// Use TLS for the relay connection.
    pub secure: bool,

    /// Relay username.
    pub username: String,

    /// Relay password.
    pub password: String,

    /// Sender address for outbound mail.
    pub from: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            secure: true,
            username: String::new(),
            password: String::new(),
            from: "sender@example.com".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON instead of the pretty format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
