use crate::application_port::{AuthError, UserView};
use crate::domain_model::{UserId, UserType};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    /// Latest issued pair, recorded at signup/login. `None` only for
    /// records that predate token persistence.
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserView {
    fn from(record: &UserRecord) -> Self {
        UserView {
            user_id: record.user_id,
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            user_type: record.user_type,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a new record. The email must be unique.
    async fn insert(&self, record: &UserRecord) -> Result<(), AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;

    /// Record the latest issued pair for the user. Errors if the user
    /// row does not exist: an unrecorded token counts as never issued.
    async fn update_tokens(
        &self,
        user_id: UserId,
        token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// One page of users plus the unpaged total, ordered by creation.
    async fn list_page(
        &self,
        start_index: i64,
        limit: i64,
    ) -> Result<(i64, Vec<UserRecord>), AuthError>;
}
