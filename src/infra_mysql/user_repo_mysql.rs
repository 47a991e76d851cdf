use super::util::is_dup_key;
use crate::application_port::AuthError;
use crate::domain_model::{UserId, UserType};
use crate::domain_port::{UserRecord, UserRepo};
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

/// Schema (email carries a UNIQUE index):
///
/// ```sql
/// CREATE TABLE user (
///     user_id       BINARY(16)   NOT NULL PRIMARY KEY,
///     first_name    VARCHAR(30)  NOT NULL,
///     last_name     VARCHAR(30)  NOT NULL,
///     email         VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     user_type     VARCHAR(8)   NOT NULL,
///     token         TEXT         NULL,
///     refresh_token TEXT         NULL,
///     created_at    DATETIME(3)  NOT NULL,
///     updated_at    DATETIME(3)  NOT NULL
/// );
/// ```
pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    #[inline]
    fn uid_as_bytes(id: &UserId) -> &[u8] {
        id.0.as_bytes()
    }

    #[inline]
    fn uid_from_bytes(id: &[u8]) -> Result<UserId, AuthError> {
        Ok(UserId(
            Uuid::from_slice(id).map_err(|e| AuthError::Store(e.to_string()))?,
        ))
    }

    fn row_to_record(row: MySqlRow) -> Result<UserRecord, AuthError> {
        let user_id_bytes: Vec<u8> = row
            .try_get("user_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_id = Self::uid_from_bytes(&user_id_bytes)?;

        let first_name: String = row
            .try_get("first_name")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let last_name: String = row
            .try_get("last_name")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let email: String = row
            .try_get("email")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let user_type: String = row
            .try_get("user_type")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_type: UserType = user_type
            .parse()
            .map_err(|e: crate::domain_model::UnknownUserType| AuthError::Store(e.to_string()))?;

        let token: Option<String> = row
            .try_get("token")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let refresh_token: Option<String> = row
            .try_get("refresh_token")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(UserRecord {
            user_id,
            first_name,
            last_name,
            email,
            password_hash,
            user_type,
            token,
            refresh_token,
            created_at,
            updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
SELECT user_id, first_name, last_name, email, password_hash, user_type,
       token, refresh_token, created_at, updated_at
FROM user
"#;

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn insert(&self, record: &UserRecord) -> Result<(), AuthError> {
        sqlx::query(
            r#"
INSERT INTO user (user_id, first_name, last_name, email, password_hash,
                  user_type, token, refresh_token, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(Self::uid_as_bytes(&record.user_id))
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(record.user_type.to_string())
        .bind(&record.token)
        .bind(&record.refresh_token)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::EmailExists(record.email.clone())
            } else {
                AuthError::Store(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let row_opt: Option<MySqlRow> =
            sqlx::query(&format!("{} WHERE email = ?", SELECT_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let row_opt: Option<MySqlRow> =
            sqlx::query(&format!("{} WHERE user_id = ?", SELECT_COLUMNS))
                .bind(Self::uid_as_bytes(&user_id))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM user WHERE email = ?"#)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(count > 0)
    }

    async fn update_tokens(
        &self,
        user_id: UserId,
        token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
UPDATE user
SET token = ?, refresh_token = ?, updated_at = ?
WHERE user_id = ?
"#,
        )
        .bind(token)
        .bind(refresh_token)
        .bind(updated_at)
        .bind(Self::uid_as_bytes(&user_id))
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
UPDATE user
SET password_hash = ?, updated_at = ?
WHERE user_id = ?
"#,
        )
        .bind(password_hash)
        .bind(updated_at)
        .bind(Self::uid_as_bytes(&user_id))
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn list_page(
        &self,
        start_index: i64,
        limit: i64,
    ) -> Result<(i64, Vec<UserRecord>), AuthError> {
        let total: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM user"#)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let rows = sqlx::query(&format!(
            "{} ORDER BY created_at, user_id LIMIT ? OFFSET ?",
            SELECT_COLUMNS
        ))
        .bind(limit.max(0))
        .bind(start_index.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        let records = rows
            .into_iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((total, records))
    }
}
