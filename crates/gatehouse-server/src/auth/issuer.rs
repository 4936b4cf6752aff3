//! Token pair issuance and verification.
//!
//! Access and refresh tokens are HS256 JWTs signed with two unrelated
//! secrets. Refresh tokens are never stored raw: sessions are keyed by an
//! HMAC-SHA256 of the token under the refresh secret, which is
//! deterministic so the session row can be found again on refresh.

use std::time::Duration;

use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use sha2::Sha256;

use gatehouse_core::TokenConfig;
use gatehouse_core::db::unix_timestamp;

use super::claims::{Claims, TokenPayload, TokenType};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, expired, or not a JWT at all.
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Expected a {expected:?} token")]
    WrongTokenType { expected: TokenType },

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// A freshly issued access/refresh token pair. Never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl SigningKeys {
    fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }
}

/// Mints and verifies token pairs.
#[derive(Clone)]
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
    session_mac: HmacSha256,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        Self::with_ttls(
            config.access_secret.as_bytes(),
            config.refresh_secret.as_bytes(),
            ttl_secs(config.access_ttl),
            ttl_secs(config.refresh_ttl),
        )
    }

    /// Build an issuer from raw secrets and lifetimes in seconds.
    ///
    /// A negative lifetime yields tokens that are already expired.
    pub fn with_ttls(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Result<Self, TokenError> {
        let session_mac = HmacSha256::new_from_slice(refresh_secret)
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            access: SigningKeys::new(access_secret, access_ttl_secs),
            refresh: SigningKeys::new(refresh_secret, refresh_ttl_secs),
            session_mac,
            validation,
        })
    }

    pub const fn access_ttl_secs(&self) -> i64 {
        self.access.ttl_secs
    }

    pub const fn refresh_ttl_secs(&self) -> i64 {
        self.refresh.ttl_secs
    }

    /// Issue an access/refresh pair for the given identity.
    pub fn issue(&self, payload: &TokenPayload) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.sign(payload, TokenType::Access)?,
            refresh_token: self.sign(payload, TokenType::Refresh)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenType::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenType::Refresh)
    }

    /// Hex HMAC-SHA256 of a raw refresh token, used as the session lookup key.
    pub fn hash_refresh_token(&self, token: &str) -> String {
        let mut mac = self.session_mac.clone();
        mac.update(token.as_bytes());
        format!("{:x}", mac.finalize().into_bytes())
    }

    fn keys(&self, token_type: TokenType) -> &SigningKeys {
        match token_type {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
        }
    }

    fn sign(&self, payload: &TokenPayload, token_type: TokenType) -> Result<String, TokenError> {
        let keys = self.keys(token_type);
        let now = unix_timestamp();

        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: payload.sub.clone(),
            email: payload.email.clone(),
            role: payload.role,
            iat: now,
            exp: now.saturating_add(keys.ttl_secs),
            token_type,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.keys(expected).decoding, &self.validation)?;

        if data.claims.token_type != expected {
            return Err(TokenError::WrongTokenType { expected });
        }
        Ok(data.claims)
    }
}

/// Whole seconds, rounding sub-second lifetimes up so they stay positive.
fn ttl_secs(ttl: Duration) -> i64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    i64::try_from(secs).unwrap_or(i64::MAX)
}
