use super::UserId;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 hex digest of a refresh token value. Only digests are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    pub fn of(token: &str) -> Self {
        let digest = Sha256::digest(token.as_bytes());
        TokenHash(hex::encode(digest.as_slice()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct RefreshRecord {
    pub token_hash: TokenHash,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl RefreshRecord {
    #[inline]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn hash_is_stable_hex_digest() {
        let a = TokenHash::of("abc");
        assert_eq!(
            a.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(a, TokenHash::of("abc"));
        assert_ne!(a, TokenHash::of("abd"));
    }

    #[test]
    fn liveness_is_strictly_before_expiry() {
        let now = Utc::now();
        let record = RefreshRecord {
            token_hash: TokenHash::of("t"),
            user_id: UserId(uuid::Uuid::nil()),
            expires_at: now,
        };
        assert!(!record.is_live(now));
        assert!(record.is_live(now - Duration::seconds(1)));
    }
}
