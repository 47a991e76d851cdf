mod invalidation_store_redis;

pub use invalidation_store_redis::*;
