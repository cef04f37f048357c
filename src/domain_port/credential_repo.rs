use crate::domain_model::UserId;
use crate::domain_port::RepoError;

/// Stored login secret for one account. Accounts are provisioned out of band.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub password_hash: String,
    pub is_active: bool,
}

#[async_trait::async_trait]
pub trait CredentialRepo: Send + Sync {
    async fn find_by_username(&self, username: &str)
    -> Result<Option<CredentialRecord>, RepoError>;
}
