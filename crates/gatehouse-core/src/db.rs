//! `SQLite` plumbing for the auth store: the error type, pool setup and the
//! [`define_database!`] handle generator.

use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Storage failures, before the auth service maps them to HTTP-facing errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

/// Writers wait this long on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool size for the on-disk auth database. Writes serialize in `SQLite`
/// anyway; a few readers cover `users/me` lookups during a rotation.
const FILE_POOL_SIZE: u32 = 5;

/// Open the auth database file, creating it and its directory if needed.
pub async fn open_pool(path: &Path) -> Result<Pool<Sqlite>, DatabaseError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io(e.to_string()))?;
    }

    let url = format!("sqlite:{}?mode=rwc", path.display());
    let pool = connect(&url, FILE_POOL_SIZE, Some(BUSY_TIMEOUT)).await?;
    info!(path = %path.display(), "Auth database opened");
    Ok(pool)
}

/// Throwaway database for tests. One connection only, since each
/// `sqlite::memory:` connection would see its own empty database.
pub async fn open_pool_in_memory() -> Result<Pool<Sqlite>, DatabaseError> {
    connect("sqlite::memory:", 1, None).await
}

async fn connect(
    url: &str,
    max_connections: u32,
    busy_timeout: Option<Duration>,
) -> Result<Pool<Sqlite>, DatabaseError> {
    let mut options = SqliteConnectOptions::from_str(url)
        .map_err(|e| DatabaseError::Connection(e.to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        // a session row must point at an existing user
        .foreign_keys(true);
    if let Some(timeout) = busy_timeout {
        options = options.busy_timeout(timeout);
    }

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))
}

/// Seconds since the Unix epoch; the unit of every `*_at` column and of
/// JWT `iat`/`exp`.
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Declares a database handle (e.g. `AuthDatabase`) that owns a `SQLite`
/// pool and applies the calling crate's `./migrations` whenever it opens.
///
/// ```ignore
/// gatehouse_core::define_database!(AuthDatabase, "auth");
/// ```
///
/// The label only shows up in the migration log line.
#[macro_export]
macro_rules! define_database {
    ($name:ident, $label:literal) => {
        #[derive(Clone)]
        pub struct $name {
            pool: ::sqlx::Pool<::sqlx::Sqlite>,
        }

        impl $name {
            pub async fn open(
                path: &::std::path::Path,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                Self::migrated($crate::db::open_pool(path).await?).await
            }

            pub async fn open_in_memory() -> ::std::result::Result<Self, $crate::db::DatabaseError>
            {
                Self::migrated($crate::db::open_pool_in_memory().await?).await
            }

            async fn migrated(
                pool: ::sqlx::Pool<::sqlx::Sqlite>,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                ::sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| $crate::db::DatabaseError::Migration(e.to_string()))?;
                ::tracing::info!(database = $label, "Migrations applied");
                Ok(Self { pool })
            }

            pub const fn pool(&self) -> &::sqlx::Pool<::sqlx::Sqlite> {
                &self.pool
            }
        }
    };
}
