use super::session_issuer::SessionIssuer;
use crate::application_port::*;
use crate::transport::TransportAdapter;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warp::http::HeaderMap;

/// Per-request authorization: extract, verify, then accept, refresh or reject.
///
/// Identity is handed back as a value. Nothing is stored on the request.
pub struct RequestGuard {
    codec: Arc<dyn TokenCodec>,
    issuer: Arc<SessionIssuer>,
    transport: Arc<TransportAdapter>,
}

impl RequestGuard {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        issuer: Arc<SessionIssuer>,
        transport: Arc<TransportAdapter>,
    ) -> Self {
        RequestGuard {
            codec,
            issuer,
            transport,
        }
    }

    /// Guard predicate over raw request headers.
    pub async fn check(&self, headers: &HeaderMap) -> Result<Authorized, GuardRejection> {
        let credentials = self.transport.extract(headers);
        self.authorize(credentials).await
    }

    pub async fn authorize(
        &self,
        credentials: ClientCredentials,
    ) -> Result<Authorized, GuardRejection> {
        let ClientCredentials {
            access_token,
            refresh_token,
            channel,
        } = credentials;

        let access_token = access_token.ok_or(GuardRejection::MissingAccessToken)?;

        match self.codec.verify(&access_token) {
            Ok(claims) => Ok(Authorized {
                identity: Identity::from(&claims),
                rotated: None,
            }),
            Err(TokenError::Invalid) => {
                debug!(?channel, "rejecting invalid access token");
                Err(GuardRejection::InvalidToken)
            }
            Err(TokenError::Expired) => {
                let refresh_token = refresh_token.ok_or(GuardRejection::MissingRefreshToken)?;
                self.refresh(&refresh_token, channel).await
            }
        }
    }

    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
        channel: TransportProfile,
    ) -> Result<Authorized, GuardRejection> {
        let session = self
            .issuer
            .rotate_pair(refresh_token)
            .await
            .map_err(|e| match e {
                AuthError::RefreshExpiredOrUnknown | AuthError::MissingRefreshToken => {
                    debug!(?channel, "refresh token expired or unknown");
                    GuardRejection::RefreshExpiredOrUnknown
                }
                AuthError::Store(e) => GuardRejection::StoreUnavailable(e),
                other => {
                    warn!(error = %other, "session rotation failed");
                    GuardRejection::IssuanceFailed(other.to_string())
                }
            })?;

        info!(user_id = %session.identity.user_id, ?channel, "session rotated");
        Ok(Authorized {
            identity: session.identity,
            rotated: Some(RotatedCredentials {
                tokens: session.tokens,
                channel,
            }),
        })
    }
}
