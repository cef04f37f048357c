use super::error::*;
use crate::application_port::*;
use crate::domain_model::UserId;
use crate::transport::TransportAdapter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::HeaderMap;
use warp::reply::Response;
use warp::{self, Reply, reject};

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

/// Session summary returned to clients. Token values travel in cookies or headers only.
#[derive(Debug, Serialize)]
pub struct SessionIssuedResponse {
    pub user_id: UserId,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl From<&LoginResult> for SessionIssuedResponse {
    fn from(result: &LoginResult) -> Self {
        SessionIssuedResponse {
            user_id: result.user_id,
            access_token_expires_at: result.tokens.access_token_expires_at,
            refresh_token_expires_at: result.tokens.refresh_token_expires_at,
        }
    }
}

fn with_tokens(
    reply: impl Reply,
    transport: &TransportAdapter,
    tokens: &TokenPair,
    channel: TransportProfile,
) -> Result<Response, warp::Rejection> {
    let mut response = reply.into_response();
    transport
        .emit(response.headers_mut(), tokens, channel)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(response)
}

fn with_cleared(
    reply: impl Reply,
    transport: &TransportAdapter,
    channel: TransportProfile,
) -> Result<Response, warp::Rejection> {
    let mut response = reply.into_response();
    transport
        .clear(response.headers_mut(), channel)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(response)
}

/// Attach credentials the guard rotated on the way in, if any.
pub fn with_rotated(
    reply: impl Reply,
    transport: &TransportAdapter,
    authorized: &Authorized,
) -> Result<Response, warp::Rejection> {
    match &authorized.rotated {
        Some(rotated) => with_tokens(reply, transport, &rotated.tokens, rotated.channel),
        None => Ok(reply.into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    headers: HeaderMap,
    auth_service: Arc<dyn AuthService>,
    transport: Arc<TransportAdapter>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        username: body.username,
        password: body.password,
    };
    let login_result = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let channel = transport.profile_for(&headers);
    let api_response = ApiResponse::ok(SessionIssuedResponse::from(&login_result));

    with_tokens(
        warp::reply::json(&api_response),
        &transport,
        &login_result.tokens,
        channel,
    )
}

pub async fn refresh(
    headers: HeaderMap,
    auth_service: Arc<dyn AuthService>,
    transport: Arc<TransportAdapter>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let credentials = transport.extract(&headers);
    let refresh_token = credentials
        .refresh_token
        .ok_or_else(|| reject::custom(ApiErrorCode::MissingRefreshToken))?;

    let login_result = auth_service
        .refresh(&refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let api_response = ApiResponse::ok(SessionIssuedResponse::from(&login_result));
    with_tokens(
        warp::reply::json(&api_response),
        &transport,
        &login_result.tokens,
        credentials.channel,
    )
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub revoked: bool,
}

pub async fn logout(
    headers: HeaderMap,
    auth_service: Arc<dyn AuthService>,
    transport: Arc<TransportAdapter>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let credentials = transport.extract(&headers);
    let revoked = match &credentials.refresh_token {
        Some(token) => auth_service
            .logout(token)
            .await
            .map_err(ApiErrorCode::from)
            .map_err(reject::custom)?
            .is_some(),
        None => false,
    };

    with_cleared(
        warp::reply::json(&ApiResponse::ok(LogoutResponse { revoked })),
        &transport,
        credentials.channel,
    )
}

#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub revoked: u64,
}

pub async fn logout_all(
    authorized: Authorized,
    headers: HeaderMap,
    auth_service: Arc<dyn AuthService>,
    transport: Arc<TransportAdapter>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let revoked = auth_service
        .logout_everywhere(authorized.identity.user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let channel = match &authorized.rotated {
        Some(rotated) => rotated.channel,
        None => transport.extract(&headers).channel,
    };
    with_cleared(
        warp::reply::json(&ApiResponse::ok(LogoutAllResponse { revoked })),
        &transport,
        channel,
    )
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub identity: Identity,
    pub refresh_live: bool,
    pub rotated: bool,
}

pub async fn session(
    authorized: Authorized,
    headers: HeaderMap,
    auth_service: Arc<dyn AuthService>,
    transport: Arc<TransportAdapter>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let refresh_live = match (&authorized.rotated, transport.extract(&headers).refresh_token) {
        (Some(_), _) => true,
        (None, Some(token)) => auth_service
            .refresh_token_live(&token)
            .await
            .map_err(ApiErrorCode::from)
            .map_err(reject::custom)?,
        (None, None) => false,
    };

    let api_response = ApiResponse::ok(SessionResponse {
        identity: authorized.identity.clone(),
        refresh_live,
        rotated: authorized.rotated.is_some(),
    });
    with_rotated(warp::reply::json(&api_response), &transport, &authorized)
}
