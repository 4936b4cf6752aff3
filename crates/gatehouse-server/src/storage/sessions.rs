//! Session queries (session store).
//!
//! A session row binds one refresh token (stored as a keyed hash) to a user.
//! Rows are never deleted; revocation stamps `revoked_at` and is final.

use gatehouse_core::db::unix_timestamp;

use super::db::{AuthDatabase, DatabaseError};
use super::models::{ActiveSession, ClientInfo, Session};

impl AuthDatabase {
    /// Record a session for a freshly issued refresh token.
    pub async fn create_session(
        &self,
        user_id: &str,
        refresh_token_hash: &str,
        client: &ClientInfo,
    ) -> Result<Session, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO sessions (id, user_id, refresh_token_hash, user_agent, ip, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(refresh_token_hash)
        .bind(client.user_agent.as_deref())
        .bind(client.ip.as_deref())
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_session(&id).await
    }

    /// Get a session by ID, active or not.
    pub async fn get_session(&self, id: &str) -> Result<Session, DatabaseError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Session {id}")))
    }

    /// Find the active session bound to a refresh token hash, with its user.
    ///
    /// Revoked rows never match.
    pub async fn find_active_session_by_hash(
        &self,
        refresh_token_hash: &str,
    ) -> Result<Option<ActiveSession>, DatabaseError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE refresh_token_hash = ? AND revoked_at IS NULL ORDER BY created_at DESC LIMIT 1",
        )
        .bind(refresh_token_hash)
        .fetch_optional(self.pool())
        .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        let user = self.get_user(&session.user_id).await?;
        Ok(Some(ActiveSession { session, user }))
    }

    /// List every session of a user, newest first.
    pub async fn list_user_sessions(&self, user_id: &str) -> Result<Vec<Session>, DatabaseError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = ? ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(sessions)
    }

    /// Revoke a session.
    ///
    /// Idempotent: returns `false` when the session was already revoked or
    /// does not exist, and leaves the original `revoked_at` untouched.
    pub async fn revoke_session(&self, id: &str) -> Result<bool, DatabaseError> {
        let result =
            sqlx::query("UPDATE sessions SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL")
                .bind(unix_timestamp())
                .bind(id)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke every active session of a user. Returns how many were revoked.
    pub async fn revoke_user_sessions(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(unix_timestamp())
        .bind(user_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Replace an active session with a new one in a single transaction.
    ///
    /// The old row is revoked only if it is still active; when another
    /// caller got there first nothing is written and `None` is returned, so
    /// one refresh token can rotate at most once.
    pub async fn rotate_session(
        &self,
        old_session_id: &str,
        user_id: &str,
        new_refresh_token_hash: &str,
        client: &ClientInfo,
    ) -> Result<Option<Session>, DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let now = unix_timestamp();

        let revoked =
            sqlx::query("UPDATE sessions SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL")
                .bind(now)
                .bind(old_session_id)
                .execute(&mut *tx)
                .await?;

        if revoked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let new_id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO sessions (id, user_id, refresh_token_hash, user_agent, ip, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_id)
        .bind(user_id)
        .bind(new_refresh_token_hash)
        .bind(client.user_agent.as_deref())
        .bind(client.ip.as_deref())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_session(&new_id).await.map(Some)
    }
}
