use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const REFRESH_TOKEN_LEN: usize = 43;

#[derive(Debug, Clone)]
pub struct IssuedRefresh {
    pub token: RefreshToken,
    pub expires_at: DateTime<Utc>,
}

/// Single-use, expiring refresh tokens on top of a [`RefreshTokenRepo`].
///
/// Every repo call is bounded by `timeout`. Repo failures and timeouts come back
/// as `Unavailable`, never as `NotFoundOrExpired`.
pub struct RefreshStore {
    repo: Arc<dyn RefreshTokenRepo>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl RefreshStore {
    pub fn new(repo: Arc<dyn RefreshTokenRepo>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        RefreshStore {
            repo,
            clock,
            timeout,
        }
    }

    #[inline]
    fn new_token() -> RefreshToken {
        RefreshToken(nanoid!(REFRESH_TOKEN_LEN))
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, RepoError>>,
    ) -> Result<T, RefreshStoreError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "refresh store call failed");
                Err(RefreshStoreError::Unavailable(e.to_string()))
            }
            Err(_) => {
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "refresh store call timed out");
                Err(RefreshStoreError::Unavailable(format!("{op} timed out")))
            }
        }
    }

    pub async fn issue(
        &self,
        user_id: UserId,
        ttl: Duration,
    ) -> Result<IssuedRefresh, RefreshStoreError> {
        let token = Self::new_token();
        let expires_at = self.clock.now() + ttl;
        let record = RefreshRecord {
            token_hash: TokenHash::of(&token.0),
            user_id,
            expires_at,
        };
        self.bounded("insert", self.repo.insert(&record)).await?;
        debug!(%user_id, %expires_at, "refresh token issued");
        Ok(IssuedRefresh { token, expires_at })
    }

    /// Consume `token`. Exactly one concurrent caller can succeed for a given value.
    pub async fn redeem(&self, token: &RefreshToken) -> Result<UserId, RefreshStoreError> {
        let hash = TokenHash::of(&token.0);
        let now = self.clock.now();
        self.bounded("take_live", self.repo.take_live(&hash, now))
            .await?
            .ok_or(RefreshStoreError::NotFoundOrExpired)
    }

    /// Consume `token` and persist its replacement for the same user.
    pub async fn rotate(
        &self,
        token: &RefreshToken,
        ttl: Duration,
    ) -> Result<(UserId, IssuedRefresh), RefreshStoreError> {
        let old_hash = TokenHash::of(&token.0);
        let new_token = Self::new_token();
        let new_hash = TokenHash::of(&new_token.0);
        let now = self.clock.now();
        let expires_at = now + ttl;

        let user_id = self
            .bounded(
                "rotate",
                self.repo.rotate(&old_hash, now, &new_hash, expires_at),
            )
            .await?
            .ok_or(RefreshStoreError::NotFoundOrExpired)?;

        debug!(%user_id, %expires_at, "refresh token rotated");
        Ok((
            user_id,
            IssuedRefresh {
                token: new_token,
                expires_at,
            },
        ))
    }

    pub async fn is_live(&self, token: &RefreshToken) -> Result<bool, RefreshStoreError> {
        let hash = TokenHash::of(&token.0);
        self.bounded("exists", self.repo.exists(&hash, self.clock.now()))
            .await
    }

    pub async fn revoke(&self, token: &RefreshToken) -> Result<bool, RefreshStoreError> {
        let hash = TokenHash::of(&token.0);
        self.bounded("delete", self.repo.delete(&hash)).await
    }

    pub async fn revoke_all(&self, user_id: UserId) -> Result<u64, RefreshStoreError> {
        self.bounded("delete_by_user", self.repo.delete_by_user(user_id))
            .await
    }

    pub async fn purge_expired(&self) -> Result<u64, RefreshStoreError> {
        self.bounded("purge_expired", self.repo.purge_expired(self.clock.now()))
            .await
    }
}
