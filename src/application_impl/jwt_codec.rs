use crate::application_port::*;
use crate::domain_model::UserId;
use crate::domain_port::Clock;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub signing_key: Vec<u8>,
}

/// HS256 access tokens. Expiry is checked against the injected clock after the
/// signature and the issuer/audience checks pass, so a forged token is always
/// `Invalid` and never `Expired`.
pub struct JwtHs256Codec {
    cfg: JwtConfig,
    clock: Arc<dyn Clock>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(&cfg.signing_key);
        let decoding_key = DecodingKey::from_secret(&cfg.signing_key);
        JwtHs256Codec {
            cfg,
            clock,
            encoding_key,
            decoding_key,
        }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = false;
        v.leeway = 0;
        v.set_audience(&[self.cfg.audience.as_str()]);
        v.set_issuer(&[self.cfg.issuer.as_str()]);
        v
    }
}

impl TokenCodec for JwtHs256Codec {
    fn sign(&self, user: UserId, ttl: Duration) -> Result<(AccessToken, AccessClaims), AuthError> {
        let iat_dt = self.clock.now();
        let exp_dt = iat_dt + ttl;
        let claims = AccessClaims {
            sub: user,
            iat: iat_dt.timestamp(),
            exp: exp_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            jti: Self::gen_jti(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok((AccessToken(token), claims))
    }

    fn verify(&self, token: &AccessToken) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(&token.0, &self.decoding_key, &self.validation())
            .map_err(|_| TokenError::Invalid)?;
        if data.claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::ManualClock;
    use chrono::Utc;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn codec_with(key: &str, clock: Arc<ManualClock>) -> JwtHs256Codec {
        JwtHs256Codec::new(
            JwtConfig {
                issuer: "tallyguard.test".to_string(),
                audience: "tallyguard-client".to_string(),
                signing_key: key.as_bytes().to_vec(),
            },
            clock,
        )
    }

    fn user() -> UserId {
        UserId(uuid::Uuid::new_v4())
    }

    #[test]
    fn valid_token_returns_signed_claims_unchanged() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codec = codec_with("k1", clock);
        let uid = user();

        let (token, claims) = codec.sign(uid, HOUR).unwrap();
        let verified = codec.verify(&token).unwrap();

        assert_eq!(verified, claims);
        assert_eq!(verified.sub, uid);
        assert_eq!(verified.exp - verified.iat, 3600);
    }

    #[test]
    fn token_past_expiry_is_expired() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codec = codec_with("k1", clock.clone());
        let (token, _) = codec.sign(user(), HOUR).unwrap();

        clock.advance(chrono::Duration::minutes(61));
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn altered_signature_is_invalid_even_when_expired() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codec = codec_with("k1", clock.clone());
        let (token, _) = codec.sign(user(), HOUR).unwrap();

        let sig_start = token.0.rfind('.').unwrap() + 1;
        let mut forged: Vec<char> = token.0.chars().collect();
        let i = sig_start + 10;
        forged[i] = if forged[i] == 'A' { 'B' } else { 'A' };
        let forged = AccessToken(forged.into_iter().collect());

        assert_eq!(codec.verify(&forged), Err(TokenError::Invalid));
        clock.advance(chrono::Duration::days(1));
        assert_eq!(codec.verify(&forged), Err(TokenError::Invalid));
    }

    #[test]
    fn foreign_key_and_garbage_are_invalid() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ours = codec_with("k1", clock.clone());
        let theirs = codec_with("k2", clock);
        let (token, _) = theirs.sign(user(), HOUR).unwrap();

        assert_eq!(ours.verify(&token), Err(TokenError::Invalid));
        assert_eq!(
            ours.verify(&AccessToken("not.a.jwt".to_string())),
            Err(TokenError::Invalid)
        );
    }
}
