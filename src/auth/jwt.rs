/// Token Codec
///
/// Mints and verifies the access/refresh token pair. Each token class has
/// its own HMAC secret, so a token of one class never verifies as the other.
/// Verification is stateless: signature and expiry are the whole check.

use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ConfigError};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Access and refresh token issued together for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenCodec {
    /// Build a codec from validated settings
    ///
    /// # Errors
    /// Returns a config error for empty or shared secrets and non-positive TTLs
    pub fn new(config: &JwtSettings) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            access: SigningKeys::from_secret(&config.access_secret),
            refresh: SigningKeys::from_secret(&config.refresh_secret),
            access_ttl: config.access_token_expiry,
            refresh_ttl: config.refresh_token_expiry,
        })
    }

    /// Access token lifetime in seconds
    pub fn access_ttl(&self) -> i64 {
        self.access_ttl
    }

    /// Refresh token lifetime in seconds
    pub fn refresh_ttl(&self) -> i64 {
        self.refresh_ttl
    }

    /// Issue a fresh token pair for `account_id`
    pub fn issue(&self, account_id: Uuid) -> Result<TokenPair, AppError> {
        self.issue_at(account_id, Utc::now())
    }

    /// Issue a token pair as if the current time were `now`
    ///
    /// Both tokens carry the same subject.
    pub fn issue_at(&self, account_id: Uuid, now: DateTime<Utc>) -> Result<TokenPair, AppError> {
        let access_token = self.sign(
            TokenKind::Access,
            &Claims::new(account_id, now, self.access_ttl),
        )?;
        let refresh_token = self.sign(
            TokenKind::Refresh,
            &Claims::new(account_id, now, self.refresh_ttl),
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token
    ///
    /// # Errors
    /// `InvalidToken` on bad signature, expiry, malformed input or bad subject
    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(TokenKind::Access, token, Utc::now())
    }

    /// Verify a refresh token
    ///
    /// # Errors
    /// `InvalidToken` on bad signature, expiry, malformed input or bad subject
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(TokenKind::Refresh, token, Utc::now())
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn sign(&self, kind: TokenKind, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(ALGORITHM), claims, &self.keys(kind).encoding)
            .map_err(|e| AppError::Internal(format!("{} token generation failed: {}", kind, e)))
    }

    fn verify(&self, kind: TokenKind, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(token_kind = %kind, error = %e, "Token verification failed");
                AuthError::InvalidToken
            })?;

        // The library treats `exp == now` as still valid
        if claims.is_expired_at(now) {
            tracing::debug!(token_kind = %kind, "Token expired");
            return Err(AuthError::InvalidToken);
        }

        claims.account_id()?;
        Ok(claims)
    }
}
