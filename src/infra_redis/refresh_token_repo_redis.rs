use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{
    AsyncCommands, FromRedisValue, RedisError, RedisResult, RedisWrite, Script, ToRedisArgs,
    Value,
};

const REFRESH_INSERT: &str = include_str!("refresh_insert.lua");
const REFRESH_TAKE: &str = include_str!("refresh_take.lua");
const REFRESH_ROTATE: &str = include_str!("refresh_rotate.lua");
const REFRESH_REVOKE_USER: &str = include_str!("refresh_revoke_user.lua");

/// Refresh tokens as `{prefix}:rt:{digest} -> user id` with a per-user index set
/// `{prefix}:user:{user id}`. Expiry is enforced by Redis key TTLs.
pub struct RedisRefreshTokenRepo {
    conn: ConnectionManager,
    prefix: String,
    insert_script: Script,
    take_script: Script,
    rotate_script: Script,
    revoke_user_script: Script,
}

impl RedisRefreshTokenRepo {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisRefreshTokenRepo {
            conn,
            prefix: prefix.into(),
            insert_script: Script::new(REFRESH_INSERT),
            take_script: Script::new(REFRESH_TAKE),
            rotate_script: Script::new(REFRESH_ROTATE),
            revoke_user_script: Script::new(REFRESH_REVOKE_USER),
        }
    }

    fn token_prefix(&self) -> String {
        format!("{}:rt:", self.prefix)
    }

    fn index_prefix(&self) -> String {
        format!("{}:user:", self.prefix)
    }

    fn token_key(&self, hash: &TokenHash) -> String {
        format!("{}{}", self.token_prefix(), hash)
    }

    fn index_key(&self, user_id: UserId) -> String {
        format!("{}{}", self.index_prefix(), user_id)
    }

    async fn take_any(&self, token_hash: &TokenHash) -> Result<Option<UserId>, RepoError> {
        let mut conn = self.conn.clone();
        let owner: Option<UserId> = self
            .take_script
            .key(self.token_key(token_hash))
            .arg(self.index_prefix())
            .arg(token_hash.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RepoError::Store(e.to_string()))?;
        Ok(owner)
    }
}

impl ToRedisArgs for UserId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.to_string().as_bytes())
    }
}

impl FromRedisValue for UserId {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let s: String = redis::from_redis_value(v)?;
        let user_id = s.parse::<UserId>().map_err(|e| {
            RedisError::from((
                redis::ErrorKind::TypeError,
                "invalid UserId string",
                e.to_string(),
            ))
        })?;
        Ok(user_id)
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for RedisRefreshTokenRepo {
    async fn insert(&self, record: &RefreshRecord) -> Result<(), RepoError> {
        let key = self.token_key(&record.token_hash);
        let index = self.index_key(record.user_id);
        let expires_at = record.expires_at.timestamp();
        let mut conn = self.conn.clone();

        // The index is only touched once SET NX has claimed the digest.
        let created: i64 = self
            .insert_script
            .key(&key)
            .key(&index)
            .arg(&record.user_id)
            .arg(record.token_hash.as_str())
            .arg(expires_at)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RepoError::Store(e.to_string()))?;

        match created {
            1 => Ok(()),
            _ => Err(RepoError::Duplicate),
        }
    }

    // A key past its TTL is already gone, so whatever GET finds is live.
    async fn take_live(
        &self,
        token_hash: &TokenHash,
        _now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepoError> {
        self.take_any(token_hash).await
    }

    async fn rotate(
        &self,
        old_hash: &TokenHash,
        _now: DateTime<Utc>,
        new_hash: &TokenHash,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepoError> {
        let mut conn = self.conn.clone();
        let owner: Option<UserId> = self
            .rotate_script
            .key(self.token_key(old_hash))
            .key(self.token_key(new_hash))
            .arg(self.index_prefix())
            .arg(old_hash.as_str())
            .arg(new_hash.as_str())
            .arg(new_expires_at.timestamp())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RepoError::Store(e.to_string()))?;
        Ok(owner)
    }

    async fn exists(&self, token_hash: &TokenHash, _now: DateTime<Utc>) -> Result<bool, RepoError> {
        let mut conn = self.conn.clone();
        conn.exists(self.token_key(token_hash))
            .await
            .map_err(|e| RepoError::Store(e.to_string()))
    }

    async fn delete(&self, token_hash: &TokenHash) -> Result<bool, RepoError> {
        Ok(self.take_any(token_hash).await?.is_some())
    }

    async fn delete_by_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let mut conn = self.conn.clone();
        let removed: u64 = self
            .revoke_user_script
            .key(self.index_key(user_id))
            .arg(self.token_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RepoError::Store(e.to_string()))?;
        Ok(removed)
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, RepoError> {
        Ok(0)
    }
}
