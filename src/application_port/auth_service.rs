use crate::domain_model::{AuthIdentity, UserId, UserType};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user with the mail ID {0} already exists")]
    EmailExists(String),
    #[error("user not found")]
    UserNotFound,
    #[error("invalid user data: {0}")]
    Validation(String),
    #[error("old password incorrect")]
    OldPasswordMismatch,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("token revoked by global invalidation")]
    TokenRevoked,
    #[error("token revoked for user {0}")]
    TokenRevokedForUser(UserId),
    #[error("global invalidation lookup failed: {detail}")]
    RevocationUnavailable { detail: String },
    #[error("invalidation lookup failed for user {user_id}: {detail}")]
    RevocationUnavailableForUser { user_id: UserId, detail: String },
    #[error("cache error: {0}")]
    Cache(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Identity attributes a token is minted from. The issuer takes these as
/// already verified; it never re-checks them against the store.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
}

/// Claims recovered from a cryptographically verified access token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub user_type: UserType,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: super::UserView,
    pub tokens: AuthTokens,
}

/// Signs and parses the two token kinds.
///
/// The refresh token is a bare renewal ticket: it carries an expiry and
/// nothing else, so it cannot be resolved back to a user on its own.
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access_token(
        &self,
        subject: &TokenSubject,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;
    async fn issue_refresh_token(&self) -> Result<(RefreshToken, DateTime<Utc>), AuthError>;
    async fn verify_access_token(&self, token: &str) -> Result<TokenClaims, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn signup(&self, request: SignupInput) -> Result<UserId, AuthError>;
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    /// Full request-gate check: signature, expiry, then the global and
    /// per-user invalidation watermarks, in that order. Fails closed when
    /// a watermark cannot be read.
    async fn authenticate(&self, token: &str) -> Result<AuthIdentity, AuthError>;
    /// Administrative kill switch: voids every access token issued
    /// before now. Not wired to any route.
    async fn invalidate_all_tokens(&self) -> Result<(), AuthError>;
}
