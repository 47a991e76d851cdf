use crate::domain_model::{UserId, UserType};
use chrono::{DateTime, Utc};

/// Identity attributes established by the auth guard for one request.
///
/// This is the typed replacement for stashing individual claims in an
/// untyped request context: handlers receive the whole struct and the
/// compiler checks every field access.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    /// Natural expiry of the access token that proved this identity.
    /// The remaining window doubles as the TTL for any per-user
    /// invalidation watermark written on behalf of this request.
    pub token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unauthorized to access the resource")]
pub struct PolicyError;

impl AuthIdentity {
    /// Exact role match. There is no hierarchy: `Admin` does not satisfy
    /// a `User` requirement, nor the other way around.
    pub fn check_user_type(&self, required: UserType) -> Result<(), PolicyError> {
        if self.user_type != required {
            return Err(PolicyError);
        }
        Ok(())
    }

    /// Ownership check for `/users/{user_id}`-shaped resources: a `User`
    /// may only act on their own id, every other role is passed through
    /// to a self-role check that cannot fail.
    pub fn match_user_to_id(&self, resource_user_id: UserId) -> Result<(), PolicyError> {
        if self.user_type == UserType::User && self.user_id != resource_user_id {
            return Err(PolicyError);
        }
        self.check_user_type(self.user_type)
    }
}
