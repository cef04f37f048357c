use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use crate::transport::TransportError;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), code.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::BadRequest, e.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else {
        warn!("unhandled rejection: {:?}", err);
        (ApiErrorCode::InternalError, format!("Unhandled error: {:?}", err))
    };

    let status = code.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    #[error("Access token missing")]
    MissingAccessToken,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Refresh token missing")]
    MissingRefreshToken,
    #[error("Refresh token expired, please login again")]
    RefreshExpiredOrUnknown,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Session store unavailable")]
    StoreUnavailable,
    #[error("Failed to issue session")]
    IssuanceFailed,
    #[error("Malformed request")]
    BadRequest,
    #[error("Not found")]
    NotFound,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::MissingAccessToken
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::MissingRefreshToken
            | ApiErrorCode::RefreshExpiredOrUnknown
            | ApiErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::IssuanceFailed | ApiErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<GuardRejection> for ApiErrorCode {
    fn from(rejection: GuardRejection) -> Self {
        debug!(code = rejection.code(), "request rejected by guard");
        match rejection {
            GuardRejection::MissingAccessToken => ApiErrorCode::MissingAccessToken,
            GuardRejection::InvalidToken => ApiErrorCode::InvalidToken,
            GuardRejection::MissingRefreshToken => ApiErrorCode::MissingRefreshToken,
            GuardRejection::RefreshExpiredOrUnknown => ApiErrorCode::RefreshExpiredOrUnknown,
            GuardRejection::StoreUnavailable(e) => {
                warn!("store unavailable: {}", e);
                ApiErrorCode::StoreUnavailable
            }
            GuardRejection::IssuanceFailed(e) => {
                warn!("issuance failed: {}", e);
                ApiErrorCode::IssuanceFailed
            }
        }
    }
}

impl From<TransportError> for ApiErrorCode {
    fn from(error: TransportError) -> Self {
        warn!("credential emission failed: {}", error);
        ApiErrorCode::IssuanceFailed
    }
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::MissingRefreshToken => ApiErrorCode::MissingRefreshToken,
            AuthError::RefreshExpiredOrUnknown => ApiErrorCode::RefreshExpiredOrUnknown,
            AuthError::Store(e) => {
                warn!("store unavailable: {}", e);
                ApiErrorCode::StoreUnavailable
            }
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
