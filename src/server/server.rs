use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::{InvalidationStore, UserRepo};
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60); // 1 day
const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60); // 1 day

/// Composition root. Clients are constructed once here and handed to
/// each component by reference; nothing looks them up ambiently.
pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let key = std::env::var("JWT_SIGNING_KEY")
            .unwrap_or_else(|_| "my-dev-secret-key".to_string())
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            access_ttl: ACCESS_TOKEN_TTL,
            refresh_ttl: REFRESH_TOKEN_TTL,
            signing_key: key,
        }));
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);

        let (user_repo, pool): (Arc<dyn UserRepo>, Option<Pool<MySql>>) =
            match settings.store.backend.as_str() {
                "memory" => (Arc::new(MemoryUserRepo::new()), None),
                "mysql" => {
                    let pool = Pool::<MySql>::connect(&settings.store.mysql_url).await?;
                    (Arc::new(MySqlUserRepo::new(pool.clone())), Some(pool))
                }
                other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
            };

        let invalidation_store: Arc<dyn InvalidationStore> =
            match settings.cache.backend.as_str() {
                "memory" => Arc::new(MemoryInvalidationStore::new()),
                "redis" => {
                    let redis_client = redis::Client::open(settings.cache.redis_url.as_str())?;
                    let redis_manager = redis_client.get_connection_manager().await?;
                    Arc::new(RedisInvalidationStore::new(redis_manager))
                }
                other => return Err(anyhow::anyhow!("Unknown cache backend: {}", other)),
            };

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo.clone(),
            credential_hasher.clone(),
            token_codec,
            invalidation_store.clone(),
        ));

        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(
            user_repo,
            credential_hasher,
            invalidation_store,
        ));

        info!("server started");

        Ok(Self {
            auth_service,
            user_service,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
