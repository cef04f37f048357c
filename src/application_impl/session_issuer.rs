use super::refresh_store::RefreshStore;
use crate::application_port::*;
use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy)]
pub struct SessionTtl {
    pub access: Duration,
    pub refresh: Duration,
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub identity: Identity,
    pub tokens: TokenPair,
}

/// Mints access/refresh pairs. A pair is only returned when both halves exist.
pub struct SessionIssuer {
    codec: Arc<dyn TokenCodec>,
    store: Arc<RefreshStore>,
    ttl: SessionTtl,
}

impl SessionIssuer {
    pub fn new(codec: Arc<dyn TokenCodec>, store: Arc<RefreshStore>, ttl: SessionTtl) -> Self {
        SessionIssuer { codec, store, ttl }
    }

    fn session(
        access_token: AccessToken,
        claims: &AccessClaims,
        refresh_token: RefreshToken,
        refresh_expires_at: DateTime<Utc>,
    ) -> IssuedSession {
        let identity = Identity::from(claims);
        IssuedSession {
            tokens: TokenPair {
                access_token,
                refresh_token,
                access_token_expires_at: identity.expires_at,
                refresh_token_expires_at: refresh_expires_at,
            },
            identity,
        }
    }

    pub async fn issue_pair(&self, user_id: UserId) -> Result<IssuedSession, AuthError> {
        let (access_token, claims) = self.codec.sign(user_id, self.ttl.access)?;
        let refresh = self.store.issue(user_id, self.ttl.refresh).await?;
        Ok(Self::session(
            access_token,
            &claims,
            refresh.token,
            refresh.expires_at,
        ))
    }

    /// Redeem `refresh_token` and mint a new pair for its owner.
    ///
    /// Once the store has rotated, the old token stays consumed whatever happens
    /// next; a signing failure fails the whole call.
    pub async fn rotate_pair(
        &self,
        refresh_token: &RefreshToken,
    ) -> Result<IssuedSession, AuthError> {
        let (user_id, refresh) = self.store.rotate(refresh_token, self.ttl.refresh).await?;

        let (access_token, claims) = match self.codec.sign(user_id, self.ttl.access) {
            Ok(signed) => signed,
            Err(e) => {
                error!(%user_id, error = %e, "signing failed after refresh rotation");
                if let Err(revoke_err) = self.store.revoke(&refresh.token).await {
                    warn!(%user_id, error = %revoke_err, "could not revoke orphaned refresh token");
                }
                return Err(e);
            }
        };

        Ok(Self::session(
            access_token,
            &claims,
            refresh.token,
            refresh.expires_at,
        ))
    }
}
