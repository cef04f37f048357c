use crate::application_port::*;
use crate::domain_model::UserId;
use crate::domain_port::CredentialRepo;
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use std::sync::Arc;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
        }
    }
}

/// Username/password check against stored credentials.
pub struct PasswordIdentityProvider {
    credential_repo: Arc<dyn CredentialRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
}

impl PasswordIdentityProvider {
    pub fn new(
        credential_repo: Arc<dyn CredentialRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            credential_repo,
            credential_hasher,
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for PasswordIdentityProvider {
    async fn verify(&self, input: LoginInput) -> Result<UserId, AuthError> {
        let LoginInput { username, password } = input;

        let rec = self
            .credential_repo
            .find_by_username(&username)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !rec.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(rec.user_id)
    }
}
