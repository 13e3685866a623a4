//! Shared fixed-window counters for rate limiting.
//!
//! The production store keeps counters in redis so every process sees the
//! same window; the in-memory store backs single-node deployments and the
//! test suite.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::store::StoreError;

/// Result of counting one request inside the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Requests observed in the window, including this one.
    pub count: u64,
    /// Epoch milliseconds at which the window resets.
    pub reset_at_ms: u64,
}

/// Fixed-window counter store keyed by client identity.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Record one hit for `key` and report the window state.
    /// The first hit of a window starts its TTL.
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit, StoreError>;
}

/// Redis-backed counter store (shared across processes).
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    key_prefix: &'static str,
}

impl RedisCounterStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            key_prefix: "RATE-LIMIT",
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}-{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit, StoreError> {
        let key = self.key(key);
        let window_ms = window.as_millis() as i64;
        let mut conn = self.conn.clone();

        let count: i64 = conn.incr(&key, 1i64).await?;
        if count == 1 {
            let _: bool = redis::cmd("PEXPIRE")
                .arg(&key)
                .arg(window_ms)
                .query_async(&mut conn)
                .await?;
        }
        let ttl_ms: i64 = redis::cmd("PTTL").arg(&key).query_async(&mut conn).await?;

        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let remaining_ms = if ttl_ms > 0 { ttl_ms as u64 } else { window_ms as u64 };

        Ok(WindowHit {
            count: count.max(0) as u64,
            reset_at_ms: now_ms + remaining_ms,
        })
    }
}

/// Process-local counter store.
#[derive(Default)]
pub struct MemoryCounterStore {
    windows: Mutex<HashMap<String, (u64, Instant)>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit, StoreError> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| StoreError::Internal("counter mutex poisoned".to_string()))?;
        let now = Instant::now();
        let entry = windows.entry(key.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) >= window {
            *entry = (0, now);
        }
        entry.0 += 1;

        let elapsed = now.duration_since(entry.1);
        let remaining = window.saturating_sub(elapsed);
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Ok(WindowHit {
            count: entry.0,
            reset_at_ms: now_ms + remaining.as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_counts_within_window() {
        let store = MemoryCounterStore::new();
        let window = Duration::from_secs(60);
        for expected in 1..=5 {
            let hit = store.hit("1.2.3.4", window).await.unwrap();
            assert_eq!(hit.count, expected);
        }
        // Separate keys count independently.
        let other = store.hit("5.6.7.8", window).await.unwrap();
        assert_eq!(other.count, 1);
    }

    #[tokio::test]
    async fn memory_store_resets_after_window() {
        let store = MemoryCounterStore::new();
        let window = Duration::from_millis(20);
        assert_eq!(store.hit("k", window).await.unwrap().count, 1);
        assert_eq!(store.hit("k", window).await.unwrap().count, 2);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.hit("k", window).await.unwrap().count, 1);
    }
}
