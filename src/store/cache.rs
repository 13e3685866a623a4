//! Auth cache: time-boxed credential subsets keyed by user uuid.
//!
//! Entries are created lazily on a lookup miss with set-if-absent semantics
//! (first writer wins), invalidated on password change or deletion, and
//! otherwise expire at the configured TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::security::auth::AuthRecord;
use crate::store::StoreError;

const KEY_PREFIX: &str = "AUTH-CACHE";

/// Key-value store holding cached credential subsets.
#[async_trait]
pub trait AuthCacheStore: Send + Sync {
    /// Fetch an entry; unparseable values count as a miss.
    async fn get(&self, uuid: Uuid) -> Result<Option<AuthRecord>, StoreError>;

    /// Store an entry only if the key is absent, with the configured TTL.
    async fn set_if_absent(&self, uuid: Uuid, record: &AuthRecord) -> Result<(), StoreError>;

    /// Remove an entry; returns the number of keys deleted.
    async fn delete(&self, uuid: Uuid) -> Result<u64, StoreError>;
}

fn cache_key(uuid: Uuid) -> String {
    format!("{KEY_PREFIX}-{uuid}")
}

/// Redis-backed auth cache (memory db0).
#[derive(Clone)]
pub struct RedisAuthCache {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisAuthCache {
    pub fn new(conn: ConnectionManager, ttl: Duration) -> Self {
        Self { conn, ttl }
    }
}

#[async_trait]
impl AuthCacheStore for RedisAuthCache {
    async fn get(&self, uuid: Uuid) -> Result<Option<AuthRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(cache_key(uuid)).await?;
        // A value that does not parse back is treated as a miss, not an error.
        Ok(raw.and_then(|value| serde_json::from_str(&value).ok()))
    }

    async fn set_if_absent(&self, uuid: Uuid, record: &AuthRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_string(record)
            .map_err(|e| StoreError::Internal(format!("serialize cache entry: {e}")))?;
        let expire_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
            + self.ttl.as_millis() as u64;

        let mut conn = self.conn.clone();
        // PXAT: absolute expiry in milliseconds. NX: only set when absent.
        let _: Option<String> = redis::cmd("SET")
            .arg(cache_key(uuid))
            .arg(payload)
            .arg("PXAT")
            .arg(expire_at_ms)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, uuid: Uuid) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: u64 = conn.del(cache_key(uuid)).await?;
        Ok(deleted)
    }
}

/// Process-local auth cache for tests and single-node development.
#[derive(Default)]
pub struct MemoryAuthCache {
    entries: Mutex<HashMap<Uuid, (AuthRecord, Instant)>>,
    ttl: Duration,
}

impl MemoryAuthCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, (AuthRecord, Instant)>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Internal("cache mutex poisoned".to_string()))
    }
}

#[async_trait]
impl AuthCacheStore for MemoryAuthCache {
    async fn get(&self, uuid: Uuid) -> Result<Option<AuthRecord>, StoreError> {
        let mut entries = self.lock()?;
        match entries.get(&uuid) {
            Some((record, stored_at)) if stored_at.elapsed() < self.ttl => {
                Ok(Some(record.clone()))
            }
            Some(_) => {
                entries.remove(&uuid);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_if_absent(&self, uuid: Uuid, record: &AuthRecord) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries
            .entry(uuid)
            .or_insert_with(|| (record.clone(), Instant::now()));
        Ok(())
    }

    async fn delete(&self, uuid: Uuid) -> Result<u64, StoreError> {
        let mut entries = self.lock()?;
        Ok(entries.remove(&uuid).map(|_| 1).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(password: &str) -> AuthRecord {
        AuthRecord {
            id: 1,
            uuid: Uuid::new_v4(),
            password: password.to_string(),
            salt: "salt".to_string(),
        }
    }

    #[tokio::test]
    async fn set_if_absent_does_not_overwrite() {
        let cache = MemoryAuthCache::new(Duration::from_secs(60));
        let uuid = Uuid::new_v4();
        let first = record("first");
        let second = record("second");

        cache.set_if_absent(uuid, &first).await.unwrap();
        cache.set_if_absent(uuid, &second).await.unwrap();

        let stored = cache.get(uuid).await.unwrap().unwrap();
        assert_eq!(stored.password, "first");
    }

    #[tokio::test]
    async fn delete_reports_removed_count() {
        let cache = MemoryAuthCache::new(Duration::from_secs(60));
        let uuid = Uuid::new_v4();
        assert_eq!(cache.delete(uuid).await.unwrap(), 0);

        cache.set_if_absent(uuid, &record("x")).await.unwrap();
        assert_eq!(cache.delete(uuid).await.unwrap(), 1);
        assert!(cache.get(uuid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = MemoryAuthCache::new(Duration::from_millis(10));
        let uuid = Uuid::new_v4();
        cache.set_if_absent(uuid, &record("x")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get(uuid).await.unwrap().is_none());
    }
}
