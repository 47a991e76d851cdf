use crate::application_port::AuthError;
use crate::domain_model::{AuthIdentity, UserId, UserType};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Stored user projected for responses. The password hash and the
/// persisted token copies never leave the store through this type.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub start_index: i64,
    pub record_per_page: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub total_count: i64,
    pub user_items: Vec<UserView>,
}

#[derive(Debug, Clone)]
pub struct PasswordUpdateInput {
    pub old_password: String,
    pub new_password: String,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn list_users(&self, page: PageRequest) -> Result<UserPage, AuthError>;
    async fn get_user(&self, user_id: UserId) -> Result<UserView, AuthError>;
    /// Verifies the old password, stores the new hash, then writes the
    /// caller's invalidation watermark so every token issued before this
    /// instant is rejected on its next use.
    async fn update_password(
        &self,
        identity: &AuthIdentity,
        request: PasswordUpdateInput,
    ) -> Result<(), AuthError>;
}
