//! Errors surfaced by the auth orchestrator.

use crate::storage::DatabaseError;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
pub const UNAUTHORIZED: &str = "Unauthorized";
pub const USER_NOT_FOUND: &str = "User not found";
pub const EMAIL_TAKEN: &str = "User with this email already exists";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Malformed input, rejected before reaching the stores.
    #[error("{0}")]
    Validation(String),

    /// Store or crypto failure. The message is for logs, not callers.
    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    pub fn unauthorized(message: &str) -> Self {
        Self::Unauthorized(message.to_string())
    }
}

impl From<DatabaseError> for AuthError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}
