//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! users service ──→ sql.rs     (PostgreSQL pool, authoritative records)
//! auth path     ──→ cache.rs   (redis db0: cached credential subsets)
//! rate limiter  ──→ counter.rs (redis db1: fixed-window counters)
//! ```
//!
//! # Design Decisions
//! - Each backend client carries its own connection settings
//! - Cache writes are set-if-absent; the authoritative store never loses
//!   to a racing cache population
//! - Store errors surface as one error type so callers map them to a
//!   single InternalServerError envelope

pub mod cache;
pub mod counter;
pub mod sql;

/// Failure in one of the storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),
    #[error("store error: {0}")]
    Internal(String),
}
