use super::util::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlConnection, MySqlPool, Row};

/// `refresh_token` table, see `sql/mysql.sql`.
///
/// Take and rotate run in one transaction holding the row lock from
/// `SELECT ... FOR UPDATE`; a second redeemer blocks on that lock and then
/// finds the row gone.
pub struct MySqlRefreshTokenRepo {
    pool: MySqlPool,
}

impl MySqlRefreshTokenRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRefreshTokenRepo { pool }
    }

    async fn take_in_tx(
        conn: &mut MySqlConnection,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepoError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT user_id, expires_at
FROM refresh_token
WHERE token_hash = ?
FOR UPDATE
"#,
        )
        .bind(token_hash.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(store_err)?;

        let Some(row) = row_opt else {
            return Ok(None);
        };

        let user_id_bytes: Vec<u8> = row.try_get("user_id").map_err(store_err)?;
        let expires_at: DateTime<Utc> = row.try_get("expires_at").map_err(store_err)?;

        sqlx::query("DELETE FROM refresh_token WHERE token_hash = ?")
            .bind(token_hash.as_str())
            .execute(&mut *conn)
            .await
            .map_err(store_err)?;

        if expires_at > now {
            Ok(Some(uid_from_bytes(&user_id_bytes)?))
        } else {
            Ok(None)
        }
    }

    async fn insert_in(
        conn: &mut MySqlConnection,
        record: &RefreshRecord,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
INSERT INTO refresh_token (token_hash, user_id, expires_at)
VALUES (?, ?, ?)
"#,
        )
        .bind(record.token_hash.as_str())
        .bind(uid_as_bytes(&record.user_id))
        .bind(record.expires_at)
        .execute(&mut *conn)
        .await
        .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MySqlRefreshTokenRepo {
    async fn insert(&self, record: &RefreshRecord) -> Result<(), RepoError> {
        let mut conn = self.pool.acquire().await.map_err(store_err)?;
        Self::insert_in(&mut *conn, record).await
    }

    async fn take_live(
        &self,
        token_hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let owner = Self::take_in_tx(&mut *tx, token_hash, now).await?;
        tx.commit().await.map_err(store_err)?;
        Ok(owner)
    }

    async fn rotate(
        &self,
        old_hash: &TokenHash,
        now: DateTime<Utc>,
        new_hash: &TokenHash,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let owner = Self::take_in_tx(&mut *tx, old_hash, now).await?;
        if let Some(user_id) = owner {
            let record = RefreshRecord {
                token_hash: new_hash.clone(),
                user_id,
                expires_at: new_expires_at,
            };
            Self::insert_in(&mut *tx, &record).await?;
        }
        tx.commit().await.map_err(store_err)?;
        Ok(owner)
    }

    async fn exists(&self, token_hash: &TokenHash, now: DateTime<Utc>) -> Result<bool, RepoError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM refresh_token WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(token_hash.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(found.is_some())
    }

    async fn delete(&self, token_hash: &TokenHash) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE token_hash = ?")
            .bind(token_hash.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE user_id = ?")
            .bind(uid_as_bytes(&user_id))
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }
}
