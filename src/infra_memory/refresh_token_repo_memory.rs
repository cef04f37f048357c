use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Process-local refresh token records. Shard locks make `take_live` a single
/// atomic remove, so concurrent redemptions race on the map, not on a read.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenRepo {
    records: DashMap<TokenHash, RefreshRecord>,
}

impl MemoryRefreshTokenRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MemoryRefreshTokenRepo {
    async fn insert(&self, record: &RefreshRecord) -> Result<(), RepoError> {
        match self.records.entry(record.token_hash.clone()) {
            Entry::Occupied(_) => Err(RepoError::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn take_live(
        &self,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepoError> {
        Ok(match self.records.remove(token_hash) {
            Some((_, record)) if record.is_live(now) => Some(record.user_id),
            _ => None,
        })
    }

    async fn exists(&self, token_hash: &TokenHash, now: DateTime<Utc>) -> Result<bool, RepoError> {
        Ok(self
            .records
            .get(token_hash)
            .map(|record| record.is_live(now))
            .unwrap_or(false))
    }

    async fn delete(&self, token_hash: &TokenHash) -> Result<bool, RepoError> {
        Ok(self.records.remove(token_hash).is_some())
    }

    async fn delete_by_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let mut removed = 0u64;
        self.records.retain(|_, record| {
            if record.user_id == user_id {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut removed = 0u64;
        self.records.retain(|_, record| {
            if record.is_live(now) {
                true
            } else {
                removed += 1;
                false
            }
        });
        Ok(removed)
    }
}
