/// Token Claims
///
/// Payload carried by both access and refresh tokens. Only `sub` is
/// trusted downstream; the rest drive expiry and uniqueness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (account ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token ID, keeps pairs minted in the same second distinct
    pub jti: String,
}

impl Claims {
    /// Create claims for `account_id` that expire `ttl_seconds` after `now`
    pub fn new(account_id: Uuid, now: DateTime<Utc>, ttl_seconds: i64) -> Self {
        let iat = now.timestamp();
        Self {
            sub: account_id.to_string(),
            iat,
            exp: iat + ttl_seconds,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract the account ID from the subject claim
    ///
    /// # Errors
    /// Returns `InvalidToken` if the subject is not a UUID
    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
    }

    /// A token is expired from the second its `exp` is reached
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
