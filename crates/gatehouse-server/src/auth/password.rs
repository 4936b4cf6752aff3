//! Password hashing and verification using argon2id.
//!
//! Hashes are PHC strings with a per-password random salt. Verification
//! goes through argon2's own constant-time comparison.

use std::sync::OnceLock;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

pub use argon2::password_hash::Error as PasswordError;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a candidate password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only a malformed stored hash is an error.
pub fn verify_password(candidate: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash)?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordError::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Burn the same work as a real verification when there is no user to check.
///
/// Keeps "unknown email" and "wrong password" indistinguishable by timing.
pub fn verify_dummy(candidate: &str) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    if let Some(hash) = DUMMY_HASH.get_or_init(|| hash_password("gatehouse-dummy-password").ok()) {
        let _ = verify_password(candidate, hash);
    }
}
