use crate::application_port::{
    AuthError, CredentialHasher, PageRequest, PasswordUpdateInput, UserPage, UserService, UserView,
};
use crate::domain_model::{AuthIdentity, UserId};
use crate::domain_port::{InvalidationStore, UserRepo};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    invalidation_store: Arc<dyn InvalidationStore>,
}

impl RealUserService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        invalidation_store: Arc<dyn InvalidationStore>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            invalidation_store,
        }
    }

    fn ttl_secs(until: DateTime<Utc>) -> u64 {
        let now = Utc::now();
        let secs = (until - now).num_seconds();
        if secs <= 0 { 1 } else { secs as u64 }
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn list_users(&self, page: PageRequest) -> Result<UserPage, AuthError> {
        let (total_count, records) = self
            .user_repo
            .list_page(page.start_index, page.record_per_page)
            .await?;

        Ok(UserPage {
            total_count,
            user_items: records.iter().map(UserView::from).collect(),
        })
    }

    async fn get_user(&self, user_id: UserId) -> Result<UserView, AuthError> {
        let record = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(UserView::from(&record))
    }

    async fn update_password(
        &self,
        identity: &AuthIdentity,
        request: PasswordUpdateInput,
    ) -> Result<(), AuthError> {
        let record = self
            .user_repo
            .find_by_email(&identity.email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let ok = self
            .credential_hasher
            .verify_password(&request.old_password, &record.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::OldPasswordMismatch);
        }

        let new_hash = self
            .credential_hasher
            .hash_password(&request.new_password)
            .await?;
        self.user_repo
            .update_password(record.user_id, &new_hash, Utc::now())
            .await?;

        // Void every token issued before this instant. The watermark
        // only needs to outlive the caller's current token, so its TTL
        // is the remaining validity window.
        let ttl = Duration::from_secs(Self::ttl_secs(identity.token_expires_at));
        self.invalidation_store
            .set_user(record.user_id, Utc::now().timestamp(), ttl)
            .await
            .map_err(|e| AuthError::Cache(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{
        Argon2PasswordHasher, JwtConfig, JwtHs256Codec, RealAuthService,
    };
    use crate::application_port::{AuthService, LoginInput, SignupInput};
    use crate::domain_model::UserType;
    use crate::domain_port::UserRecord;
    use crate::infra_memory::{MemoryInvalidationStore, MemoryUserRepo};

    fn record(n: u32) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            user_id: UserId::generate(),
            first_name: format!("First{}", n),
            last_name: format!("Last{}", n),
            email: format!("user{}@example.test", n),
            password_hash: "$argon2id$unused".to_string(),
            user_type: UserType::User,
            token: None,
            refresh_token: None,
            created_at: now + chrono::Duration::milliseconds(n as i64),
            updated_at: now,
        }
    }

    fn user_service(repo: Arc<MemoryUserRepo>, store: Arc<MemoryInvalidationStore>) -> RealUserService {
        RealUserService::new(repo, Arc::new(Argon2PasswordHasher), store)
    }

    #[tokio::test]
    async fn list_users_pages_and_counts() {
        let repo = Arc::new(MemoryUserRepo::new());
        for n in 0..5 {
            repo.insert(&record(n)).await.unwrap();
        }
        let service = user_service(repo, Arc::new(MemoryInvalidationStore::new()));

        let page = service
            .list_users(PageRequest {
                start_index: 2,
                record_per_page: 2,
            })
            .await
            .unwrap();
        assert_eq!(page.total_count, 5);
        assert_eq!(page.user_items.len(), 2);
        assert_eq!(page.user_items[0].email, "user2@example.test");

        let past_end = service
            .list_users(PageRequest {
                start_index: 10,
                record_per_page: 2,
            })
            .await
            .unwrap();
        assert_eq!(past_end.total_count, 5);
        assert!(past_end.user_items.is_empty());
    }

    #[tokio::test]
    async fn get_user_never_exposes_the_password_hash() {
        let repo = Arc::new(MemoryUserRepo::new());
        let rec = record(1);
        repo.insert(&rec).await.unwrap();
        let service = user_service(repo, Arc::new(MemoryInvalidationStore::new()));

        let view = service.get_user(rec.user_id).await.unwrap();
        let json = serde_json::to_value(&view).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert!(keys.iter().all(|k| !k.contains("password")));
        assert!(keys.iter().all(|k| !k.contains("token")));
    }

    #[tokio::test]
    async fn get_user_missing_is_not_found() {
        let service = user_service(
            Arc::new(MemoryUserRepo::new()),
            Arc::new(MemoryInvalidationStore::new()),
        );
        let err = service.get_user(UserId::generate()).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    fn auth_service(
        repo: Arc<MemoryUserRepo>,
        store: Arc<MemoryInvalidationStore>,
    ) -> RealAuthService {
        RealAuthService::new(
            repo,
            Arc::new(Argon2PasswordHasher),
            Arc::new(JwtHs256Codec::new(JwtConfig {
                access_ttl: Duration::from_secs(24 * 60 * 60),
                refresh_ttl: Duration::from_secs(24 * 60 * 60),
                signing_key: b"test-signing-secret".to_vec(),
            })),
            store,
        )
    }

    #[tokio::test]
    async fn wrong_old_password_is_rejected_and_does_not_revoke() {
        let repo = Arc::new(MemoryUserRepo::new());
        let store = Arc::new(MemoryInvalidationStore::new());
        let auth = auth_service(repo.clone(), store.clone());
        let users = user_service(repo, store);

        auth.signup(SignupInput {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.test".to_string(),
            password: "old password".to_string(),
            user_type: UserType::User,
        })
        .await
        .unwrap();
        let login = auth
            .login(LoginInput {
                email: "ada@example.test".to_string(),
                password: "old password".to_string(),
            })
            .await
            .unwrap();
        let identity = auth.authenticate(&login.tokens.access_token.0).await.unwrap();

        let err = users
            .update_password(
                &identity,
                PasswordUpdateInput {
                    old_password: "not the old password".to_string(),
                    new_password: "new password".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::OldPasswordMismatch));
        // Token still valid: nothing was revoked.
        assert!(auth.authenticate(&login.tokens.access_token.0).await.is_ok());
    }

    #[tokio::test]
    async fn password_reset_revokes_the_previous_token() {
        let repo = Arc::new(MemoryUserRepo::new());
        let store = Arc::new(MemoryInvalidationStore::new());
        let auth = auth_service(repo.clone(), store.clone());
        let users = user_service(repo, store);

        let user_id = auth
            .signup(SignupInput {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.test".to_string(),
                password: "old password".to_string(),
                user_type: UserType::User,
            })
            .await
            .unwrap();
        let login = auth
            .login(LoginInput {
                email: "ada@example.test".to_string(),
                password: "old password".to_string(),
            })
            .await
            .unwrap();
        let old_token = login.tokens.access_token.0.clone();
        let identity = auth.authenticate(&old_token).await.unwrap();

        // Watermarks have one-second resolution; step past the issue
        // instant so the reset lands strictly after it.
        tokio::time::sleep(Duration::from_millis(1100)).await;

        users
            .update_password(
                &identity,
                PasswordUpdateInput {
                    old_password: "old password".to_string(),
                    new_password: "new password".to_string(),
                },
            )
            .await
            .unwrap();

        // The very next use of the old token must fail.
        let err = auth.authenticate(&old_token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenRevokedForUser(id) if id == user_id));

        // Old credentials are gone, new ones work, and the fresh token
        // (issued at or after the watermark) is accepted.
        assert!(matches!(
            auth.login(LoginInput {
                email: "ada@example.test".to_string(),
                password: "old password".to_string(),
            })
            .await
            .unwrap_err(),
            AuthError::InvalidCredentials
        ));
        let relogin = auth
            .login(LoginInput {
                email: "ada@example.test".to_string(),
                password: "new password".to_string(),
            })
            .await
            .unwrap();
        assert!(auth.authenticate(&relogin.tokens.access_token.0).await.is_ok());
    }
}
