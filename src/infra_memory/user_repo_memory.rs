use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::{UserRecord, UserRepo};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Process-local credential store for the `memory` backend and tests.
/// Lookups scan the map; fine at fake scale.
pub struct MemoryUserRepo {
    users: DashMap<UserId, UserRecord>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        MemoryUserRepo {
            users: DashMap::new(),
        }
    }

    fn scan_email(&self, email: &str) -> Option<UserRecord> {
        self.users
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone())
    }
}

impl Default for MemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn insert(&self, record: &UserRecord) -> Result<(), AuthError> {
        if self.scan_email(&record.email).is_some() {
            return Err(AuthError::EmailExists(record.email.clone()));
        }
        self.users.insert(record.user_id, record.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.scan_email(email))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.scan_email(email).is_some())
    }

    async fn update_tokens(
        &self,
        user_id: UserId,
        token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut entry = self.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        let record = entry.value_mut();
        record.token = Some(token.to_string());
        record.refresh_token = Some(refresh_token.to_string());
        record.updated_at = updated_at;
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut entry = self.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        let record = entry.value_mut();
        record.password_hash = password_hash.to_string();
        record.updated_at = updated_at;
        Ok(())
    }

    async fn list_page(
        &self,
        start_index: i64,
        limit: i64,
    ) -> Result<(i64, Vec<UserRecord>), AuthError> {
        let mut all: Vec<UserRecord> = self
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(start_index.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((total, items))
    }
}
