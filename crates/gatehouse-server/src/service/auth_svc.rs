//! `AuthService` implementation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::auth::{Claims, TokenIssuer, TokenPair, TokenPayload, password};
use crate::storage::{AuthDatabase, ClientInfo, DatabaseError, Role, User};

use super::error::{
    AuthError, EMAIL_TAKEN, INVALID_CREDENTIALS, INVALID_REFRESH_TOKEN, UNAUTHORIZED, USER_NOT_FOUND,
};

/// Public fields of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: DateTime::from_timestamp(user.created_at, 0).unwrap_or_default(),
        }
    }
}

/// Result of a successful register or login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    fn new(user: &User, tokens: TokenPair) -> Self {
        Self {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

/// Coordinates the credential store, session store and token issuer.
pub struct AuthService {
    db: AuthDatabase,
    issuer: Arc<TokenIssuer>,
}

impl AuthService {
    pub const fn new(db: AuthDatabase, issuer: Arc<TokenIssuer>) -> Self {
        Self { db, issuer }
    }

    /// Create a user, storing only an argon2id hash of the password.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let hash = password::hash_password(password)
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {e}")))?;

        let user_id = uuid::Uuid::new_v4().to_string();
        self.db
            .create_user(&user_id, email, &hash, Role::default())
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(_) => AuthError::Conflict(EMAIL_TAKEN.into()),
                other => other.into(),
            })
    }

    /// Check a candidate password against the user's stored hash.
    pub fn verify_password(&self, user: &User, candidate: &str) -> Result<bool, AuthError> {
        password::verify_password(candidate, &user.password_hash)
            .map_err(|e| AuthError::Internal(format!("Password verification failed: {e}")))
    }

    #[instrument(skip(self, password, client))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<AuthResponse, AuthError> {
        let user = self.create_user(email, password).await?;
        let tokens = self.open_session(&user, &client).await?;

        info!(user_id = %user.id, "User registered");
        Ok(AuthResponse::new(&user, tokens))
    }

    #[instrument(skip(self, password, client))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<AuthResponse, AuthError> {
        let Some(user) = self.db.find_user_by_email(email).await? else {
            password::verify_dummy(password);
            warn!(email, "Failed login attempt");
            return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
        };

        if !self.verify_password(&user, password)? {
            warn!(email, "Failed login attempt");
            return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
        }

        let tokens = self.open_session(&user, &client).await?;

        info!(user_id = %user.id, "User logged in");
        Ok(AuthResponse::new(&user, tokens))
    }

    /// Exchange a refresh token for a new pair, revoking the old session.
    ///
    /// The new session keeps the client metadata of the one it replaces.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .issuer
            .verify_refresh(refresh_token)
            .map_err(|_| AuthError::unauthorized(INVALID_REFRESH_TOKEN))?;

        let token_hash = self.issuer.hash_refresh_token(refresh_token);
        let active = self
            .db
            .find_active_session_by_hash(&token_hash)
            .await?
            .filter(|active| active.user.id == claims.sub)
            .ok_or_else(|| AuthError::unauthorized(INVALID_REFRESH_TOKEN))?;

        let tokens = self.issue(&active.user)?;
        let client = ClientInfo {
            user_agent: active.session.user_agent.clone(),
            ip: active.session.ip.clone(),
        };

        let rotated = self
            .db
            .rotate_session(
                &active.session.id,
                &active.user.id,
                &self.issuer.hash_refresh_token(&tokens.refresh_token),
                &client,
            )
            .await?;

        let Some(session) = rotated else {
            warn!(user_id = %active.user.id, "Refresh token reused during rotation");
            return Err(AuthError::unauthorized(INVALID_REFRESH_TOKEN));
        };

        info!(user_id = %active.user.id, session_id = %session.id, "Session rotated");
        Ok(tokens)
    }

    /// Revoke the session bound to a refresh token. Never fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) {
        match self.revoke_by_token(refresh_token).await {
            Ok(true) => debug!("Session revoked"),
            Ok(false) => debug!("Logout for unknown or already revoked session"),
            Err(e) => debug!(error = %e, "Logout failed"),
        }
    }

    /// Revoke every active session of a user.
    #[instrument(skip(self))]
    pub async fn logout_all(&self, user_id: &str) -> Result<u64, AuthError> {
        let revoked = self.db.revoke_user_sessions(user_id).await?;
        info!(user_id, revoked, "All sessions revoked");
        Ok(revoked)
    }

    /// Resolve verified access-token claims to a live user.
    pub async fn validate_access_payload(&self, claims: &Claims) -> Result<User, AuthError> {
        self.db
            .find_user_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AuthError::unauthorized(USER_NOT_FOUND))
    }

    /// Verify a bearer access token and load its user.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self
            .issuer
            .verify_access(access_token)
            .map_err(|e| {
                debug!(error = %e, "Access token rejected");
                AuthError::unauthorized(UNAUTHORIZED)
            })?;
        self.validate_access_payload(&claims).await
    }

    fn issue(&self, user: &User) -> Result<TokenPair, AuthError> {
        self.issuer
            .issue(&TokenPayload::from(user))
            .map_err(|e| AuthError::Internal(format!("Token creation failed: {e}")))
    }

    async fn open_session(&self, user: &User, client: &ClientInfo) -> Result<TokenPair, AuthError> {
        let tokens = self.issue(user)?;
        let token_hash = self.issuer.hash_refresh_token(&tokens.refresh_token);
        self.db.create_session(&user.id, &token_hash, client).await?;
        Ok(tokens)
    }

    async fn revoke_by_token(&self, refresh_token: &str) -> Result<bool, DatabaseError> {
        let token_hash = self.issuer.hash_refresh_token(refresh_token);
        match self.db.find_active_session_by_hash(&token_hash).await? {
            Some(active) => self.db.revoke_session(&active.session.id).await,
            None => Ok(false),
        }
    }
}
