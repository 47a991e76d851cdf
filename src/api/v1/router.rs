use super::error::*;
use super::handler;
use super::handler::ListUsersQuery;
use crate::application_port::AuthService;
use crate::domain_model::{AuthIdentity, UserId};
use crate::logger::*;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let healthz = warp::get()
        .and(warp::path("v1"))
        .and(warp::path("healthz"))
        .and(warp::path::end())
        .and_then(handler::healthz);

    let login = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let signup = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("signup"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signup);

    let list_users = warp::get()
        .and(warp::path("users"))
        .and(warp::path::end())
        .and(warp::query::<ListUsersQuery>())
        .and(with_auth(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::list_users);

    let password_reset = warp::post()
        .and(warp::path("users"))
        .and(warp::path("password_reset"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_auth(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::update_password);

    let get_user = warp::get()
        .and(warp::path("users"))
        .and(warp::path::param::<UserId>())
        .and(warp::path::end())
        .and(with_auth(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::get_user);

    healthz
        .or(login)
        .or(signup)
        .or(list_users)
        .or(password_reset)
        .or(get_user)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Request gate for every protected route: requires the Authorization
/// header, then runs the full token + watermark check. Handlers behind
/// it receive the established identity.
fn with_auth(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (AuthIdentity,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth_service = auth_service.clone();
        async move {
            let Some(raw) = header else {
                error!("Auth token not found");
                return Err(reject::custom(ApiErrorCode::TokenNotFound));
            };
            auth_service.authenticate(&raw).await.map_err(|e| {
                error!("Auth token rejected: {}", e);
                reject::custom(ApiErrorCode::from(e))
            })
        }
    })
}
