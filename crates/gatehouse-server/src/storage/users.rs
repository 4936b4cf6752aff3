//! User queries (credential store).

use gatehouse_core::db::unix_timestamp;

use super::db::{AuthDatabase, DatabaseError};
use super::models::{Role, User};

impl AuthDatabase {
    /// Insert a new user.
    ///
    /// Fails with [`DatabaseError::Conflict`] when the email is already
    /// registered. Emails are compared byte-for-byte.
    pub async fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Conflict(_) => {
                DatabaseError::Conflict(format!("User with email {email} already exists"))
            }
            other => other,
        })?;

        self.get_user(id).await
    }

    /// Get a user by ID, failing with `NotFound` if absent.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        self.find_user_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;

        Ok(user)
    }
}
