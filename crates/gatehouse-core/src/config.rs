//! Configuration for Gatehouse.
//!
//! Token settings come from the environment (through the server's CLI
//! layer) as secrets plus human-readable expirations such as `15m` or
//! `30d`. This module parses and validates them.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default lifetime of access tokens.
pub const DEFAULT_ACCESS_EXPIRATION: &str = "15m";

/// Default lifetime of refresh tokens.
pub const DEFAULT_REFRESH_EXPIRATION: &str = "30d";

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
const SECS_PER_WEEK: u64 = 7 * SECS_PER_DAY;
/// 365.25 days.
const SECS_PER_YEAR: u64 = 31_557_600;

/// Signing secrets and lifetimes for the two token classes.
///
/// Access and refresh tokens are signed with different secrets so that
/// leaking one secret does not let an attacker mint the other class.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Build a config from raw secrets and expiration strings, then validate it.
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        access_expiration: &str,
        refresh_expiration: &str,
    ) -> Result<Self> {
        let config = Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: parse_duration(access_expiration).map_err(|e| {
                Error::Config(format!("JWT_ACCESS_EXPIRATION: {e}"))
            })?,
            refresh_ttl: parse_duration(refresh_expiration).map_err(|e| {
                Error::Config(format!("JWT_REFRESH_EXPIRATION: {e}"))
            })?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the token issuer relies on.
    pub fn validate(&self) -> Result<()> {
        if self.access_secret.is_empty() {
            return Err(Error::Config("JWT_ACCESS_SECRET must not be empty".into()));
        }
        if self.refresh_secret.is_empty() {
            return Err(Error::Config("JWT_REFRESH_SECRET must not be empty".into()));
        }
        if self.access_secret == self.refresh_secret {
            return Err(Error::Config(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ".into(),
            ));
        }
        if self.access_ttl.is_zero() || self.refresh_ttl.is_zero() {
            return Err(Error::Config("token expirations must be positive".into()));
        }
        if self.access_ttl > self.refresh_ttl {
            tracing::warn!(
                access_ttl_secs = self.access_ttl.as_secs(),
                refresh_ttl_secs = self.refresh_ttl.as_secs(),
                "Access tokens outlive refresh tokens"
            );
        }
        Ok(())
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Parse an expiration such as `900`, `15m`, `12h` or `30d`.
///
/// A bare integer is seconds. Supported units: `ms`, `s`, `m`, `h`, `d`,
/// `w`, `y`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    if digits.is_empty() {
        return Err(Error::Config(format!("invalid duration {input:?}")));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| Error::Config(format!("invalid duration {input:?}")))?;

    let scale = match unit.trim() {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => 1,
        "m" => SECS_PER_MINUTE,
        "h" => SECS_PER_HOUR,
        "d" => SECS_PER_DAY,
        "w" => SECS_PER_WEEK,
        "y" => SECS_PER_YEAR,
        other => {
            return Err(Error::Config(format!(
                "unknown duration unit {other:?} in {input:?}"
            )));
        }
    };

    value
        .checked_mul(scale)
        .map(Duration::from_secs)
        .ok_or_else(|| Error::Config(format!("duration {input:?} overflows")))
}

/// Default location of the auth database: `~/.gatehouse/auth.db`.
pub fn database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".gatehouse").join("auth.db"))
}
