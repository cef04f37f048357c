use super::util::*;
use crate::domain_port::*;
use sqlx::MySqlPool;

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: Vec<u8>,
    password_hash: String,
    is_active: bool,
}

/// Read side of the `auth_credential` table.
pub struct MySqlCredentialRepo {
    pool: MySqlPool,
}

impl MySqlCredentialRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlCredentialRepo { pool }
    }
}

#[async_trait::async_trait]
impl CredentialRepo for MySqlCredentialRepo {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, RepoError> {
        let row: Option<CredentialRow> = sqlx::query_as(
            r#"
SELECT user_id, password_hash, is_active
FROM auth_credential
WHERE username = ?
"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(|row| {
            Ok(CredentialRecord {
                user_id: uid_from_bytes(&row.user_id)?,
                password_hash: row.password_hash,
                is_active: row.is_active,
            })
        })
        .transpose()
    }
}
