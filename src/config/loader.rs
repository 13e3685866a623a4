//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, AuthMode};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
///
/// Environment variables override the file for connection secrets and
/// deployment-specific values, so the same file works across environments.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: AppConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a configuration entirely from defaults plus environment overrides.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(v) = std::env::var("APP_NAME") {
        config.app.name = v;
    }
    if let Ok(v) = std::env::var("APP_ENV") {
        config.app.environment = v;
    }
    if let Ok(v) = std::env::var("DEBUG") {
        config.app.debug = parse_bool(&v);
    }
    if let Ok(v) = std::env::var("DATABASE_URL") {
        config.sql.url = v;
    }
    if let Ok(v) = std::env::var("CACHE_REDIS_URL") {
        config.auth_cache.url = v;
    }
    if let Ok(v) = std::env::var("RATE_LIMIT_REDIS_URL") {
        config.rate_limit.url = v;
    }
    if let Ok(v) = std::env::var("AUTH_TYPE") {
        config.auth.mode = match v.as_str() {
            "bearer" => AuthMode::Bearer,
            "basic" => AuthMode::Basic,
            _ => AuthMode::None,
        };
    }
    if let Ok(v) = std::env::var("AUTH_URI") {
        config.auth.auth_uri = v;
    }
    if let Ok(v) = std::env::var("HOST") {
        config.auth.host = v;
    }
    if let Ok(v) = std::env::var("HASH_ALGO") {
        config.auth.hash_algo = v;
    }
    if let Ok(v) = std::env::var("SMTP_HOST") {
        config.smtp.host = v;
    }
    if let Ok(v) = std::env::var("SMTP_PORT") {
        if let Ok(port) = v.parse() {
            config.smtp.port = port;
        }
    }
    if let Ok(v) = std::env::var("SMTP_USERNAME") {
        config.smtp.username = v;
    }
    if let Ok(v) = std::env::var("SMTP_PASSWORD") {
        config.smtp.password = v;
    }
}

/// Truthy parsing for env flags: accepts true/1/on/yes.
fn parse_bool(value: &str) -> bool {
    matches!(value, "true" | "1" | "on" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_truthy_forms() {
        for v in ["true", "1", "on", "yes"] {
            assert!(parse_bool(v), "{v} should be truthy");
        }
        for v in ["false", "0", "off", "no", ""] {
            assert!(!parse_bool(v), "{v} should be falsy");
        }
    }

    #[test]
    fn minimal_toml_parses_with_defaults() {
        let config: AppConfig = toml::from_str("[app]\nname = \"svc\"\n").unwrap();
        assert_eq!(config.app.name, "svc");
        assert_eq!(config.rate_limit.max_requests, 50);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.auth_cache.ttl_secs, 60 * 60 * 24 * 7);
    }
}
