use crate::domain_model::UserId;
use std::time::Duration;

/// Well-known cache key for the global invalidation watermark.
pub const GLOBAL_INVALIDATION_KEY: &str = "global_invalidation";
/// Per-user watermark keys are `user_invalidation:<user_id>`.
pub const USER_INVALIDATION_PREFIX: &str = "user_invalidation";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache read failed: {0}")]
    Read(String),
    #[error("cache write failed: {0}")]
    Write(String),
}

/// TTL'd watermark store backing token revocation.
///
/// A watermark is a unix timestamp: tokens whose `iat` predates it are
/// void. A missing key is the normal "no revocation" state, so reads
/// return `None` rather than an error. Writes are monotonic -
/// set-if-greater - so a delayed write carrying an older timestamp can
/// never undo a newer revocation. The TTL passed by the caller must
/// cover the longest-lived token the watermark is meant to invalidate;
/// once it lapses, every affected token has itself expired.
#[async_trait::async_trait]
pub trait InvalidationStore: Send + Sync {
    async fn set_global(&self, timestamp: i64, ttl: Duration) -> Result<(), CacheError>;

    async fn get_global(&self) -> Result<Option<i64>, CacheError>;

    async fn set_user(
        &self,
        user_id: UserId,
        timestamp: i64,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    async fn get_user(&self, user_id: UserId) -> Result<Option<i64>, CacheError>;
}
