use super::error::*;
use crate::application_port::{
    AuthService, AuthTokens, LoginInput, PageRequest, PasswordUpdateInput, SignupInput,
    UserService, UserView,
};
use crate::domain_model::{AuthIdentity, UserId, UserType};
use crate::logger::*;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use warp::{self, reject};

/// Per-request deadline for ordinary handlers. Bulk listing gets a
/// longer one. On expiry the in-flight store/cache calls are dropped
/// with the future and the request fails as a server error.
const HANDLER_DEADLINE: Duration = Duration::from_secs(10);
const LIST_DEADLINE: Duration = Duration::from_secs(100);

const RECORDS_PER_PAGE_DEFAULT: i64 = 10;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, warp::Rejection>
where
    F: Future<Output = Result<T, crate::application_port::AuthError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(ApiErrorCode::from).map_err(reject::custom),
        Err(_) => {
            warn!("Handler deadline of {:?} exceeded", limit);
            Err(reject::custom(ApiErrorCode::InternalError))
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthzResponse {
    status: &'static str,
}

pub async fn healthz() -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(HealthzResponse {
        status: "active",
    })))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub user_type: UserType,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: UserId,
}

pub async fn signup(
    body: SignupRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let signup_input = SignupInput {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        password: body.password,
        user_type: body.user_type,
    };
    let user_id = with_deadline(HANDLER_DEADLINE, auth_service.signup(signup_input)).await?;

    info!("User {} signed up", user_id);
    Ok(warp::reply::json(&ApiResponse::ok(SignupResponse {
        user_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserView,
    pub tokens: AuthTokens,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let login_result = with_deadline(HANDLER_DEADLINE, auth_service.login(login_input)).await?;

    info!("User {} logged in", login_result.user.user_id);
    Ok(warp::reply::json(&ApiResponse::ok(LoginResponse {
        user: login_result.user,
        tokens: login_result.tokens,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(rename = "recordPerPage")]
    pub record_per_page: Option<i64>,
    pub page: Option<i64>,
    #[serde(rename = "startIndex")]
    pub start_index: Option<i64>,
}

impl ListUsersQuery {
    fn page_request(&self) -> PageRequest {
        let record_per_page = self
            .record_per_page
            .filter(|v| *v > 0)
            .unwrap_or(RECORDS_PER_PAGE_DEFAULT);
        let page = self.page.filter(|v| *v > 0).unwrap_or(1);
        let start_index = self
            .start_index
            .unwrap_or((page - 1) * record_per_page);
        PageRequest {
            start_index,
            record_per_page,
        }
    }
}

pub async fn list_users(
    query: ListUsersQuery,
    identity: AuthIdentity,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    identity
        .check_user_type(UserType::Admin)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let page = with_deadline(LIST_DEADLINE, user_service.list_users(query.page_request())).await?;

    Ok(warp::reply::json(&ApiResponse::ok(page)))
}

pub async fn get_user(
    user_id: UserId,
    identity: AuthIdentity,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    identity
        .match_user_to_id(user_id)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let user = with_deadline(HANDLER_DEADLINE, user_service.get_user(user_id)).await?;

    Ok(warp::reply::json(&ApiResponse::ok(user)))
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn update_password(
    body: PasswordResetRequest,
    identity: AuthIdentity,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // The reset always targets the caller's own record.
    identity
        .match_user_to_id(identity.user_id)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let request = PasswordUpdateInput {
        old_password: body.old_password,
        new_password: body.new_password,
    };
    with_deadline(
        HANDLER_DEADLINE,
        user_service.update_password(&identity, request),
    )
    .await?;

    info!("Password updated for user {}", identity.user_id);
    Ok(warp::reply::json(&ApiResponse::ok(
        "Password updated successfully",
    )))
}
