use crate::domain_model::UserId;
use crate::domain_port::{
    CacheError, GLOBAL_INVALIDATION_KEY, InvalidationStore, USER_INVALIDATION_PREFIX,
};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::time::Duration;

const WATERMARK_SET_MAX: &str = include_str!("watermark_set_max.lua");

pub struct RedisInvalidationStore {
    conn: ConnectionManager,
}

impl RedisInvalidationStore {
    pub fn new(conn: ConnectionManager) -> Self {
        RedisInvalidationStore { conn }
    }

    fn user_key(user_id: UserId) -> String {
        format!("{}:{}", USER_INVALIDATION_PREFIX, user_id)
    }

    async fn set_max(&self, key: &str, timestamp: i64, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let script = Script::new(WATERMARK_SET_MAX);
        // EX rejects 0, and a watermark that cannot outlive this request
        // is useless anyway.
        let ttl_secs = ttl.as_secs().max(1);
        let _updated: i64 = script
            .key(key)
            .arg(timestamp)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::Write(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::Read(e.to_string()))?;
        Ok(value)
    }
}

#[async_trait::async_trait]
impl InvalidationStore for RedisInvalidationStore {
    async fn set_global(&self, timestamp: i64, ttl: Duration) -> Result<(), CacheError> {
        self.set_max(GLOBAL_INVALIDATION_KEY, timestamp, ttl).await
    }

    async fn get_global(&self) -> Result<Option<i64>, CacheError> {
        self.get(GLOBAL_INVALIDATION_KEY).await
    }

    async fn set_user(
        &self,
        user_id: UserId,
        timestamp: i64,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.set_max(&Self::user_key(user_id), timestamp, ttl).await
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<i64>, CacheError> {
        self.get(&Self::user_key(user_id)).await
    }
}
