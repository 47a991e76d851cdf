use crate::application_port::{
    AccessToken, AuthError, AuthService, AuthTokens, CredentialHasher, LoginInput, LoginResult,
    RefreshToken, SignupInput, TokenClaims, TokenCodec, TokenSubject,
};
use crate::domain_model::{AuthIdentity, UserId, UserType};
use crate::domain_port::{InvalidationStore, UserRecord, UserRepo};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let argon2 = argon2::Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash).map_err(|e| {
            AuthError::InternalError(format!("invalid PHC hash: {}", e.to_string()))
        })?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!(
                "verify error: {}",
                e.to_string()
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    email: String,
    first_name: String,
    last_name: String,
    user_type: UserType,
    user_id: UserId,
    exp: i64,
    iat: i64,
}

// A renewal ticket only: no identity claims, so it cannot be resolved
// back to a user without outside context.
#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    exp: i64,
}

fn encode_access(
    subject: &TokenSubject,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.access_ttl;
    let claims = AccessClaims {
        email: subject.email.clone(),
        first_name: subject.first_name.clone(),
        last_name: subject.last_name.clone(),
        user_type: subject.user_type,
        user_id: subject.user_id,
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn encode_refresh(cfg: &JwtConfig) -> Result<(String, DateTime<Utc>), AuthError> {
    let exp_dt = Utc::now() + cfg.refresh_ttl;
    let claims = RefreshClaims {
        exp: exp_dt.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn decode_access(token: &str, cfg: &JwtConfig) -> Result<AccessClaims, AuthError> {
    // HS256 only: a token presented with any other algorithm fails the
    // signature check outright.
    let v = Validation::new(Algorithm::HS256);
    let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(&cfg.signing_key), &v)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })?;
    Ok(data.claims)
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    fn timestamp_to_datetime(ts: i64) -> Result<DateTime<Utc>, AuthError> {
        Utc.timestamp_opt(ts, 0)
            .single()
            .ok_or(AuthError::TokenInvalid)
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        subject: &TokenSubject,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_access(subject, &self.cfg)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh_token(&self) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_refresh(&self.cfg)?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn verify_access_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = decode_access(token, &self.cfg)?;
        Ok(TokenClaims {
            user_id: claims.user_id,
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
            user_type: claims.user_type,
            issued_at: Self::timestamp_to_datetime(claims.iat)?,
            expires_at: Self::timestamp_to_datetime(claims.exp)?,
        })
    }
}

/// TTL for the global watermark. Must cover the access token lifetime,
/// otherwise a revoked-but-evicted token would be accepted again before
/// its own expiry.
const GLOBAL_INVALIDATION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 30;

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    invalidation_store: Arc<dyn InvalidationStore>,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        invalidation_store: Arc<dyn InvalidationStore>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_codec,
            invalidation_store,
        }
    }

    fn validate_signup(request: &SignupInput) -> Result<(), AuthError> {
        let name_ok = |s: &str| (NAME_MIN..=NAME_MAX).contains(&s.chars().count());
        if !name_ok(&request.first_name) {
            return Err(AuthError::Validation("first_name length".to_string()));
        }
        if !name_ok(&request.last_name) {
            return Err(AuthError::Validation("last_name length".to_string()));
        }
        if !request.email.contains('@') {
            return Err(AuthError::Validation("email malformed".to_string()));
        }
        if request.password.is_empty() {
            return Err(AuthError::Validation("password required".to_string()));
        }
        Ok(())
    }

    async fn issue_pair(&self, subject: &TokenSubject) -> Result<AuthTokens, AuthError> {
        let (access_token, access_exp) = self.token_codec.issue_access_token(subject).await?;
        let (refresh_token, refresh_exp) = self.token_codec.issue_refresh_token().await?;
        Ok(AuthTokens {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn signup(&self, request: SignupInput) -> Result<UserId, AuthError> {
        Self::validate_signup(&request)?;

        if self.user_repo.email_exists(&request.email).await? {
            return Err(AuthError::EmailExists(request.email));
        }

        let password_hash = self.credential_hasher.hash_password(&request.password).await?;

        let user_id = UserId::generate();
        let subject = TokenSubject {
            user_id,
            email: request.email.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            user_type: request.user_type,
        };
        let tokens = self.issue_pair(&subject).await?;

        let now = Utc::now();
        let record = UserRecord {
            user_id,
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            password_hash,
            user_type: request.user_type,
            token: Some(tokens.access_token.0.clone()),
            refresh_token: Some(tokens.refresh_token.0.clone()),
            created_at: now,
            updated_at: now,
        };
        self.user_repo.insert(&record).await?;

        Ok(user_id)
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let record = self
            .user_repo
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&request.password, &record.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let subject = TokenSubject {
            user_id: record.user_id,
            email: record.email.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            user_type: record.user_type,
        };
        let tokens = self.issue_pair(&subject).await?;

        // The pair only counts as issued once it is on record.
        self.user_repo
            .update_tokens(
                record.user_id,
                &tokens.access_token.0,
                &tokens.refresh_token.0,
                Utc::now(),
            )
            .await?;

        let record = self
            .user_repo
            .find_by_id(record.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(LoginResult {
            user: (&record).into(),
            tokens,
        })
    }

    async fn authenticate(&self, token: &str) -> Result<AuthIdentity, AuthError> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        let claims = self.token_codec.verify_access_token(token).await?;
        let issued_at = claims.issued_at.timestamp();

        let global = self
            .invalidation_store
            .get_global()
            .await
            .map_err(|e| AuthError::RevocationUnavailable {
                detail: e.to_string(),
            })?
            .unwrap_or(0);
        if global > 0 && issued_at < global {
            return Err(AuthError::TokenRevoked);
        }

        let user_watermark = self
            .invalidation_store
            .get_user(claims.user_id)
            .await
            .map_err(|e| AuthError::RevocationUnavailableForUser {
                user_id: claims.user_id,
                detail: e.to_string(),
            })?
            .unwrap_or(0);
        if user_watermark > 0 && issued_at < user_watermark {
            return Err(AuthError::TokenRevokedForUser(claims.user_id));
        }

        Ok(AuthIdentity {
            user_id: claims.user_id,
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
            user_type: claims.user_type,
            token_expires_at: claims.expires_at,
        })
    }

    async fn invalidate_all_tokens(&self) -> Result<(), AuthError> {
        self.invalidation_store
            .set_global(Utc::now().timestamp(), GLOBAL_INVALIDATION_TTL)
            .await
            .map_err(|e| AuthError::Cache(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::UserType;
    use crate::domain_port::CacheError;
    use crate::infra_memory::{MemoryInvalidationStore, MemoryUserRepo};

    const TEST_SECRET: &[u8] = b"test-signing-secret";

    fn jwt_config(secret: &[u8]) -> JwtConfig {
        JwtConfig {
            access_ttl: Duration::from_secs(24 * 60 * 60),
            refresh_ttl: Duration::from_secs(24 * 60 * 60),
            signing_key: secret.to_vec(),
        }
    }

    fn service_with(
        store: Arc<dyn InvalidationStore>,
    ) -> RealAuthService {
        RealAuthService::new(
            Arc::new(MemoryUserRepo::new()),
            Arc::new(Argon2PasswordHasher),
            Arc::new(JwtHs256Codec::new(jwt_config(TEST_SECRET))),
            store,
        )
    }

    fn signup_input(email: &str, user_type: UserType) -> SignupInput {
        SignupInput {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            user_type,
        }
    }

    async fn signup_and_login(service: &RealAuthService, email: &str) -> (UserId, String) {
        let user_id = service
            .signup(signup_input(email, UserType::User))
            .await
            .unwrap();
        let result = service
            .login(LoginInput {
                email: email.to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        (user_id, result.tokens.access_token.0)
    }

    fn access_token_at(iat: i64, exp: i64, user_id: UserId, secret: &[u8]) -> String {
        let claims = AccessClaims {
            email: "ada@example.test".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            user_type: UserType::User,
            user_id,
            exp,
            iat,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn signup_login_authenticate_round_trip() {
        let service = service_with(Arc::new(MemoryInvalidationStore::new()));
        let (user_id, token) = signup_and_login(&service, "ada@example.test").await;

        let identity = service.authenticate(&token).await.unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.email, "ada@example.test");
        assert_eq!(identity.user_type, UserType::User);
        assert!(identity.token_expires_at > Utc::now());
    }

    #[tokio::test]
    async fn bearer_prefix_is_stripped() {
        let service = service_with(Arc::new(MemoryInvalidationStore::new()));
        let (_, token) = signup_and_login(&service, "ada@example.test").await;

        let prefixed = format!("Bearer {}", token);
        assert!(service.authenticate(&prefixed).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let service = service_with(Arc::new(MemoryInvalidationStore::new()));
        service
            .signup(signup_input("ada@example.test", UserType::User))
            .await
            .unwrap();
        let err = service
            .signup(signup_input("ada@example.test", UserType::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailExists(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let service = service_with(Arc::new(MemoryInvalidationStore::new()));
        service
            .signup(signup_input("ada@example.test", UserType::User))
            .await
            .unwrap();
        let err = service
            .login(LoginInput {
                email: "ada@example.test".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected_regardless_of_watermarks() {
        let service = service_with(Arc::new(MemoryInvalidationStore::new()));
        let now = Utc::now().timestamp();
        let forged = access_token_at(now, now + 3600, UserId::generate(), b"other-secret");

        let err = service.authenticate(&forged).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn structurally_broken_token_is_rejected() {
        let service = service_with(Arc::new(MemoryInvalidationStore::new()));
        let err = service.authenticate("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let service = service_with(Arc::new(MemoryInvalidationStore::new()));
        let now = Utc::now().timestamp();
        let stale = access_token_at(now - 2 * 86_400, now - 86_400, UserId::generate(), TEST_SECRET);

        let err = service.authenticate(&stale).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn global_watermark_after_iat_revokes() {
        let store = Arc::new(MemoryInvalidationStore::new());
        let service = service_with(store.clone());
        let (_, token) = signup_and_login(&service, "ada@example.test").await;
        let iat = Utc::now().timestamp();

        store
            .set_global(iat + 100, GLOBAL_INVALIDATION_TTL)
            .await
            .unwrap();
        let err = service.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked));
    }

    #[tokio::test]
    async fn global_watermark_at_or_before_iat_accepts() {
        let store = Arc::new(MemoryInvalidationStore::new());
        let service = service_with(store.clone());
        let (user_id, _) = signup_and_login(&service, "ada@example.test").await;
        let now = Utc::now().timestamp();

        store
            .set_global(now - 100, GLOBAL_INVALIDATION_TTL)
            .await
            .unwrap();
        let token = access_token_at(now, now + 3600, user_id, TEST_SECRET);
        assert!(service.authenticate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn user_watermark_only_affects_that_user() {
        let store = Arc::new(MemoryInvalidationStore::new());
        let service = service_with(store.clone());
        let (revoked_id, revoked_token) = signup_and_login(&service, "a@example.test").await;
        let (_, other_token) = signup_and_login(&service, "b@example.test").await;

        store
            .set_user(revoked_id, Utc::now().timestamp() + 100, GLOBAL_INVALIDATION_TTL)
            .await
            .unwrap();

        let err = service.authenticate(&revoked_token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenRevokedForUser(id) if id == revoked_id));
        assert!(service.authenticate(&other_token).await.is_ok());
    }

    #[tokio::test]
    async fn token_issued_after_user_watermark_accepts() {
        let store = Arc::new(MemoryInvalidationStore::new());
        let service = service_with(store.clone());
        let (user_id, _) = signup_and_login(&service, "a@example.test").await;
        let now = Utc::now().timestamp();

        store
            .set_user(user_id, now - 50, GLOBAL_INVALIDATION_TTL)
            .await
            .unwrap();
        let fresh = access_token_at(now, now + 3600, user_id, TEST_SECRET);
        assert!(service.authenticate(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn invalidate_all_voids_earlier_tokens() {
        let store = Arc::new(MemoryInvalidationStore::new());
        let service = service_with(store.clone());
        let (user_id, _) = signup_and_login(&service, "a@example.test").await;
        let now = Utc::now().timestamp();
        let earlier = access_token_at(now - 100, now + 3600, user_id, TEST_SECRET);

        service.invalidate_all_tokens().await.unwrap();

        let err = service.authenticate(&earlier).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked));
        // Issued at (not before) the watermark: still good.
        let fresh = access_token_at(now, now + 3600, user_id, TEST_SECRET);
        assert!(service.authenticate(&fresh).await.is_ok());
    }

    struct FailingInvalidationStore;

    #[async_trait::async_trait]
    impl InvalidationStore for FailingInvalidationStore {
        async fn set_global(&self, _: i64, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Write("cache down".to_string()))
        }
        async fn get_global(&self) -> Result<Option<i64>, CacheError> {
            Err(CacheError::Read("cache down".to_string()))
        }
        async fn set_user(&self, _: UserId, _: i64, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Write("cache down".to_string()))
        }
        async fn get_user(&self, _: UserId) -> Result<Option<i64>, CacheError> {
            Err(CacheError::Read("cache down".to_string()))
        }
    }

    #[tokio::test]
    async fn unreachable_cache_fails_closed() {
        let service = service_with(Arc::new(FailingInvalidationStore));
        let (_, token) = signup_and_login(&service, "a@example.test").await;

        let err = service.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::RevocationUnavailable { .. }));
    }

    #[tokio::test]
    async fn refresh_token_carries_expiry_only() {
        let codec = JwtHs256Codec::new(jwt_config(TEST_SECRET));
        let (refresh, exp_dt) = codec.issue_refresh_token().await.unwrap();

        let mut v = Validation::new(Algorithm::HS256);
        v.required_spec_claims = ["exp".to_string()].into_iter().collect();
        let data = decode::<serde_json::Map<String, serde_json::Value>>(
            &refresh.0,
            &DecodingKey::from_secret(TEST_SECRET),
            &v,
        )
        .unwrap();
        assert_eq!(data.claims.len(), 1);
        assert_eq!(
            data.claims.get("exp").and_then(|v| v.as_i64()),
            Some(exp_dt.timestamp())
        );
    }

    #[tokio::test]
    async fn signup_rejects_bad_fields() {
        let service = service_with(Arc::new(MemoryInvalidationStore::new()));
        let mut short_name = signup_input("x@example.test", UserType::User);
        short_name.first_name = "A".to_string();
        assert!(matches!(
            service.signup(short_name).await.unwrap_err(),
            AuthError::Validation(_)
        ));

        let mut bad_email = signup_input("not-an-email", UserType::User);
        bad_email.email = "not-an-email".to_string();
        assert!(matches!(
            service.signup(bad_email).await.unwrap_err(),
            AuthError::Validation(_)
        ));
    }
}
