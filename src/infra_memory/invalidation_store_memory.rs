use crate::domain_model::UserId;
use crate::domain_port::{
    CacheError, GLOBAL_INVALIDATION_KEY, InvalidationStore, USER_INVALIDATION_PREFIX,
};
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Watermark {
    timestamp: i64,
    expires_at: Instant,
}

/// Process-local watermark store. Backs the `memory` cache backend and
/// the service tests; semantics mirror the Redis implementation,
/// including monotonic writes and TTL expiry.
pub struct MemoryInvalidationStore {
    entries: DashMap<String, Watermark>,
}

impl MemoryInvalidationStore {
    pub fn new() -> Self {
        MemoryInvalidationStore {
            entries: DashMap::new(),
        }
    }

    fn user_key(user_id: UserId) -> String {
        format!("{}:{}", USER_INVALIDATION_PREFIX, user_id)
    }

    fn set_max(&self, key: String, timestamp: i64, ttl: Duration) {
        let now = Instant::now();
        let fresh = Watermark {
            timestamp,
            expires_at: now + ttl,
        };
        self.entries
            .entry(key)
            .and_modify(|current| {
                // Lapsed entries lose; live entries keep the larger timestamp.
                if current.expires_at <= now || timestamp > current.timestamp {
                    *current = fresh;
                }
            })
            .or_insert(fresh);
    }

    fn get(&self, key: &str) -> Option<i64> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.timestamp)
    }
}

impl Default for MemoryInvalidationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl InvalidationStore for MemoryInvalidationStore {
    async fn set_global(&self, timestamp: i64, ttl: Duration) -> Result<(), CacheError> {
        self.set_max(GLOBAL_INVALIDATION_KEY.to_string(), timestamp, ttl);
        Ok(())
    }

    async fn get_global(&self) -> Result<Option<i64>, CacheError> {
        Ok(self.get(GLOBAL_INVALIDATION_KEY))
    }

    async fn set_user(
        &self,
        user_id: UserId,
        timestamp: i64,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.set_max(Self::user_key(user_id), timestamp, ttl);
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<i64>, CacheError> {
        Ok(self.get(&Self::user_key(user_id)))
    }
}
