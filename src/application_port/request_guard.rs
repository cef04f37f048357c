use super::auth_service::{AccessClaims, AccessToken, RefreshToken, TokenPair};
use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Wire convention used to carry credentials for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportProfile {
    #[default]
    Cookie,
    Header,
}

#[derive(Debug, Clone, Default)]
pub struct ClientCredentials {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
    /// Channel the access token arrived on, or the client's profile when absent.
    pub channel: TransportProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: UserId,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&AccessClaims> for Identity {
    fn from(claims: &AccessClaims) -> Self {
        Identity {
            user_id: claims.sub,
            session_id: claims.jti.clone(),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RotatedCredentials {
    pub tokens: TokenPair,
    pub channel: TransportProfile,
}

#[derive(Debug, Clone)]
pub struct Authorized {
    pub identity: Identity,
    pub rotated: Option<RotatedCredentials>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardRejection {
    #[error("access token missing")]
    MissingAccessToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("refresh token missing")]
    MissingRefreshToken,
    #[error("refresh token expired, please login again")]
    RefreshExpiredOrUnknown,
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("failed to issue session: {0}")]
    IssuanceFailed(String),
}

impl GuardRejection {
    pub fn code(&self) -> &'static str {
        match self {
            GuardRejection::MissingAccessToken => "MISSING_ACCESS_TOKEN",
            GuardRejection::InvalidToken => "INVALID_TOKEN",
            GuardRejection::MissingRefreshToken => "MISSING_REFRESH_TOKEN",
            GuardRejection::RefreshExpiredOrUnknown => "REFRESH_EXPIRED_OR_UNKNOWN",
            GuardRejection::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            GuardRejection::IssuanceFailed(_) => "ISSUANCE_FAILED",
        }
    }
}
