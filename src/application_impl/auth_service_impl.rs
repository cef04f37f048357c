use super::refresh_store::RefreshStore;
use super::session_issuer::SessionIssuer;
use crate::application_port::*;
use crate::domain_model::UserId;
use std::sync::Arc;
use tracing::info;

pub struct RealAuthService {
    identity_provider: Arc<dyn IdentityProvider>,
    issuer: Arc<SessionIssuer>,
    store: Arc<RefreshStore>,
}

impl RealAuthService {
    pub fn new(
        identity_provider: Arc<dyn IdentityProvider>,
        issuer: Arc<SessionIssuer>,
        store: Arc<RefreshStore>,
    ) -> Self {
        Self {
            identity_provider,
            issuer,
            store,
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let user_id = self.identity_provider.verify(request).await?;
        let session = self.issuer.issue_pair(user_id).await?;
        info!(%user_id, "login");
        Ok(LoginResult {
            user_id,
            tokens: session.tokens,
        })
    }

    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<LoginResult, AuthError> {
        let session = self.issuer.rotate_pair(refresh_token).await?;
        Ok(LoginResult {
            user_id: session.identity.user_id,
            tokens: session.tokens,
        })
    }

    async fn logout(&self, refresh_token: &RefreshToken) -> Result<Option<UserId>, AuthError> {
        match self.store.redeem(refresh_token).await {
            Ok(user_id) => {
                info!(%user_id, "logout");
                Ok(Some(user_id))
            }
            Err(RefreshStoreError::NotFoundOrExpired) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn logout_everywhere(&self, user_id: UserId) -> Result<u64, AuthError> {
        let revoked = self.store.revoke_all(user_id).await?;
        info!(%user_id, revoked, "logout everywhere");
        Ok(revoked)
    }

    async fn refresh_token_live(&self, refresh_token: &RefreshToken) -> Result<bool, AuthError> {
        Ok(self.store.is_live(refresh_token).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::*;
    use crate::infra_memory::*;
    use chrono::Utc;
    use std::time::Duration;

    fn service() -> RealAuthService {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(
            JwtConfig {
                issuer: "tallyguard.test".to_string(),
                audience: "tallyguard-client".to_string(),
                signing_key: b"svc-secret".to_vec(),
            },
            clock.clone(),
        ));
        let store = Arc::new(RefreshStore::new(
            Arc::new(MemoryRefreshTokenRepo::new()),
            clock,
            Duration::from_secs(1),
        ));
        let issuer = Arc::new(SessionIssuer::new(
            codec,
            store.clone(),
            SessionTtl {
                access: Duration::from_secs(15 * 60),
                refresh: Duration::from_secs(3 * 24 * 60 * 60),
            },
        ));
        RealAuthService::new(Arc::new(FakeIdentityProvider::new()), issuer, store)
    }

    fn login(username: &str) -> LoginInput {
        LoginInput {
            username: username.to_string(),
            password: "pw".to_string(),
        }
    }

    #[tokio::test]
    async fn logout_consumes_refresh_token_and_is_idempotent() {
        let svc = service();
        let result = svc.login(login("ganesh")).await.unwrap();
        let refresh = result.tokens.refresh_token;

        assert_eq!(svc.logout(&refresh).await.unwrap(), Some(result.user_id));
        assert_eq!(svc.logout(&refresh).await.unwrap(), None);
        assert!(!svc.refresh_token_live(&refresh).await.unwrap());
    }

    #[tokio::test]
    async fn logout_everywhere_revokes_all_sessions() {
        let svc = service();
        let a = svc.login(login("ganesh")).await.unwrap();
        let b = svc.login(login("ganesh")).await.unwrap();
        let other = svc.login(login("priya")).await.unwrap();

        assert_eq!(svc.logout_everywhere(a.user_id).await.unwrap(), 2);
        assert!(matches!(
            svc.refresh(&b.tokens.refresh_token).await,
            Err(AuthError::RefreshExpiredOrUnknown)
        ));
        assert!(svc.refresh_token_live(&other.tokens.refresh_token).await.unwrap());
    }

    #[tokio::test]
    async fn explicit_refresh_rotates() {
        let svc = service();
        let first = svc.login(login("ganesh")).await.unwrap();
        let second = svc.refresh(&first.tokens.refresh_token).await.unwrap();

        assert_eq!(second.user_id, first.user_id);
        assert!(!svc.refresh_token_live(&first.tokens.refresh_token).await.unwrap());
        assert!(svc.refresh_token_live(&second.tokens.refresh_token).await.unwrap());
    }
}
