use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("token digest already present")]
    Duplicate,
    #[error("store error: {0}")]
    Store(String),
}

/// Persistence of refresh token records, keyed by token digest.
///
/// Every method is a single bounded round-trip to the backing store.
#[async_trait::async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    async fn insert(&self, record: &RefreshRecord) -> Result<(), RepoError>;

    /// Atomically delete the record for `token_hash` and return its owner if it
    /// was still live at `now`. An expired record is deleted as well but yields
    /// `None`. Concurrent callers for the same digest: at most one sees `Some`.
    async fn take_live(
        &self,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepoError>;

    /// Replace a live record with a new one owned by the same user.
    ///
    /// Adapters that can do this in one atomic step override it. The provided
    /// version is take-then-insert: a crash between the two leaves the user with
    /// no refresh token at all.
    async fn rotate(
        &self,
        old_hash: &TokenHash,
        now: DateTime<Utc>,
        new_hash: &TokenHash,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepoError> {
        let Some(user_id) = self.take_live(old_hash, now).await? else {
            return Ok(None);
        };
        self.insert(&RefreshRecord {
            token_hash: new_hash.clone(),
            user_id,
            expires_at: new_expires_at,
        })
        .await?;
        Ok(Some(user_id))
    }

    async fn exists(&self, token_hash: &TokenHash, now: DateTime<Utc>) -> Result<bool, RepoError>;

    async fn delete(&self, token_hash: &TokenHash) -> Result<bool, RepoError>;

    async fn delete_by_user(&self, user_id: UserId) -> Result<u64, RepoError>;

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}
