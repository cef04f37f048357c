use crate::application_port::*;
use crate::domain_model::UserId;

/// Accepts any non-empty username and maps it to a stable id.
#[derive(Debug, Default)]
pub struct FakeIdentityProvider;

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn verify(&self, input: LoginInput) -> Result<UserId, AuthError> {
        if input.username.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(fake_user_id(&input.username))
    }
}

pub fn fake_user_id(username: &str) -> UserId {
    UserId(uuid::Uuid::new_v5(
        &uuid::Uuid::NAMESPACE_OID,
        username.as_bytes(),
    ))
}
