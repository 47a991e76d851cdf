use crate::api::v1::handler::ApiResponse;
use crate::application_port::AuthError;
use crate::domain_model::PolicyError;
use serde::{Serialize, Serializer};
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(err) = err.find::<ApiErrorCode>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone(), err.to_string()));
        Ok(warp::reply::with_status(json, err.status()))
    } else if err.is_not_found() {
        let code = ApiErrorCode::NotFound;
        let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
        Ok(warp::reply::with_status(json, StatusCode::NOT_FOUND))
    } else if err
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
        || err.find::<warp::reject::InvalidQuery>().is_some()
    {
        let code = ApiErrorCode::InvalidUserData;
        let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
        Ok(warp::reply::with_status(json, StatusCode::BAD_REQUEST))
    } else {
        warn!("Unhandled rejection: {:?}", err);
        let json = warp::reply::json(&ApiResponse::<()>::err(
            ApiErrorCode::InternalError,
            format!("Unhandled error: {:?}", err),
        ));
        Ok(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error)]
pub enum ApiErrorCode {
    #[error("Auth token not found")]
    TokenNotFound,
    #[error("Auth token invalid")]
    TokenInvalid,
    #[error("Auth Token Expired")]
    TokenRevoked,
    #[error("Auth token Expired for user: {0}")]
    TokenRevokedForUser(String),
    #[error("Failed to retrieve global invalidation")]
    RevocationUnavailable,
    #[error("Failed to retrieve token invalidation for User: {0}")]
    RevocationUnavailableForUser(String),
    #[error("User mail or password incorrect")]
    InvalidCredentials,
    #[error("unauthorized to access the resource")]
    Unauthorized,
    #[error("Invalid user data")]
    InvalidUserData,
    #[error("user with the mail ID {0} already exists")]
    EmailTaken(String),
    #[error("Old password incorrect")]
    OldPasswordIncorrect,
    #[error("Check the user data")]
    UserDataInvalid,
    #[error("Not Found")]
    NotFound,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorCode::TokenNotFound => "TOKEN_NOT_FOUND",
            ApiErrorCode::TokenInvalid => "TOKEN_INVALID",
            ApiErrorCode::TokenRevoked => "TOKEN_REVOKED",
            ApiErrorCode::TokenRevokedForUser(_) => "TOKEN_REVOKED_FOR_USER",
            ApiErrorCode::RevocationUnavailable => "REVOCATION_UNAVAILABLE",
            ApiErrorCode::RevocationUnavailableForUser(_) => "REVOCATION_UNAVAILABLE_FOR_USER",
            ApiErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiErrorCode::Unauthorized => "UNAUTHORIZED",
            ApiErrorCode::InvalidUserData => "INVALID_USER_DATA",
            ApiErrorCode::EmailTaken(_) => "EMAIL_TAKEN",
            ApiErrorCode::OldPasswordIncorrect => "OLD_PASSWORD_INCORRECT",
            ApiErrorCode::UserDataInvalid => "USER_DATA_INVALID",
            ApiErrorCode::NotFound => "NOT_FOUND",
            ApiErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Revocation-check failures land in the 401 group: the gate fails
    /// closed when it cannot prove a token is still valid.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::TokenNotFound
            | ApiErrorCode::TokenInvalid
            | ApiErrorCode::TokenRevoked
            | ApiErrorCode::TokenRevokedForUser(_)
            | ApiErrorCode::RevocationUnavailable
            | ApiErrorCode::RevocationUnavailableForUser(_)
            | ApiErrorCode::InvalidCredentials
            | ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::InvalidUserData
            | ApiErrorCode::EmailTaken(_)
            | ApiErrorCode::OldPasswordIncorrect => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::UserDataInvalid | ApiErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }
}

impl Serialize for ApiErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::EmailExists(email) => ApiErrorCode::EmailTaken(email),
            AuthError::UserNotFound => {
                warn!("Requested user record not found");
                ApiErrorCode::UserDataInvalid
            }
            AuthError::Validation(detail) => {
                warn!("Rejected request body: {}", detail);
                ApiErrorCode::InvalidUserData
            }
            AuthError::OldPasswordMismatch => ApiErrorCode::OldPasswordIncorrect,
            AuthError::TokenInvalid | AuthError::TokenExpired => ApiErrorCode::TokenInvalid,
            AuthError::TokenRevoked => ApiErrorCode::TokenRevoked,
            AuthError::TokenRevokedForUser(user_id) => {
                ApiErrorCode::TokenRevokedForUser(user_id.to_string())
            }
            AuthError::RevocationUnavailable { detail } => {
                warn!("Global invalidation lookup failed: {}", detail);
                ApiErrorCode::RevocationUnavailable
            }
            AuthError::RevocationUnavailableForUser { user_id, detail } => {
                warn!("Invalidation lookup failed for user {}: {}", user_id, detail);
                ApiErrorCode::RevocationUnavailableForUser(user_id.to_string())
            }
            AuthError::Cache(e) => ApiErrorCode::internal(e),
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<PolicyError> for ApiErrorCode {
    fn from(_: PolicyError) -> Self {
        ApiErrorCode::Unauthorized
    }
}
