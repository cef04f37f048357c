use super::error::*;
use super::handler;
use crate::application_impl::RequestGuard;
use crate::application_port::Authorized;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(warp::header::headers_cloned())
        .and(with(server.auth_service.clone()))
        .and(with(server.transport.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::header::headers_cloned())
        .and(with(server.auth_service.clone()))
        .and(with(server.transport.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::header::headers_cloned())
        .and(with(server.auth_service.clone()))
        .and(with(server.transport.clone()))
        .and_then(handler::logout);

    let logout_all = warp::post()
        .and(warp::path("logout_all"))
        .and(warp::path::end())
        .and(with_session(server.guard.clone()))
        .and(warp::header::headers_cloned())
        .and(with(server.auth_service.clone()))
        .and(with(server.transport.clone()))
        .and_then(handler::logout_all);

    let session = warp::get()
        .and(warp::path("session"))
        .and(warp::path::end())
        .and(with_session(server.guard.clone()))
        .and(warp::header::headers_cloned())
        .and(with(server.auth_service.clone()))
        .and(with(server.transport.clone()))
        .and_then(handler::session);

    login.or(refresh).or(logout).or(logout_all).or(session)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Runs the request guard. Handlers behind it must pass `Authorized` to
/// `handler::with_rotated` so rotated credentials reach the client.
fn with_session(
    guard: Arc<RequestGuard>,
) -> impl Filter<Extract = (Authorized,), Error = warp::Rejection> + Clone {
    warp::header::headers_cloned().and_then(move |headers: warp::http::HeaderMap| {
        let guard = guard.clone();
        async move {
            guard
                .check(&headers)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)
        }
    })
}
