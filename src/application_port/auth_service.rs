use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("refresh token missing")]
    MissingRefreshToken,
    #[error("refresh token expired or unknown")]
    RefreshExpiredOrUnknown,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Why an access token failed verification. Only `Expired` may lead to a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token invalid")]
    Invalid,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshStoreError {
    #[error("refresh token not found or expired")]
    NotFoundOrExpired,
    #[error("refresh store unavailable: {0}")]
    Unavailable(String),
}

impl From<RefreshStoreError> for AuthError {
    fn from(error: RefreshStoreError) -> Self {
        match error {
            RefreshStoreError::NotFoundOrExpired => AuthError::RefreshExpiredOrUnknown,
            RefreshStoreError::Unavailable(e) => AuthError::Store(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user_id: UserId,
    pub tokens: TokenPair,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

// Token values stay out of logs.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken(***)")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// The one claims layout every access token carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: UserId,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub jti: String,
}

pub trait TokenCodec: Send + Sync {
    fn sign(
        &self,
        user: UserId,
        ttl: Duration,
    ) -> Result<(AccessToken, AccessClaims), AuthError>;

    fn verify(&self, token: &AccessToken) -> Result<AccessClaims, TokenError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

/// Yields a verified subject for a login attempt. Account creation lives elsewhere.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, input: LoginInput) -> Result<UserId, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<LoginResult, AuthError>;
    /// Consumes the refresh token. Returns the owner when the token was still live.
    async fn logout(&self, refresh_token: &RefreshToken) -> Result<Option<UserId>, AuthError>;
    async fn logout_everywhere(&self, user_id: UserId) -> Result<u64, AuthError>;
    async fn refresh_token_live(&self, refresh_token: &RefreshToken) -> Result<bool, AuthError>;
}
