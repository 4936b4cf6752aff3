//! JWT claims carried by Gatehouse tokens.

use serde::{Deserialize, Serialize};

use crate::storage::{Role, User};

/// Which of the two token classes a JWT belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// The identity a token pair is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    pub sub: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for TokenPayload {
    fn from(user: &User) -> Self {
        Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// JWT claims embedded in both access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (user ID).
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    pub token_type: TokenType,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.token_type == TokenType::Access
    }

    pub fn is_refresh(&self) -> bool {
        self.token_type == TokenType::Refresh
    }

    pub fn payload(&self) -> TokenPayload {
        TokenPayload {
            sub: self.sub.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}
