//! Request body checks applied before anything reaches the auth service.

use crate::service::AuthError;

const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PASSWORD_CHARS: usize = 128;

pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let invalid = || AuthError::Validation("email must be an email".into());

    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(invalid()),
    }
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_CHARS {
        return Err(AuthError::Validation(format!(
            "password must be longer than or equal to {MIN_PASSWORD_CHARS} characters"
        )));
    }
    if len > MAX_PASSWORD_CHARS {
        return Err(AuthError::Validation(format!(
            "password must be shorter than or equal to {MAX_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

/// Login only needs a password to check; the length policy is not revealed.
pub fn validate_login_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::Validation("password should not be empty".into()));
    }
    if password.chars().count() > MAX_PASSWORD_CHARS {
        return Err(AuthError::Validation(format!(
            "password must be shorter than or equal to {MAX_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn validate_refresh_token(token: &str) -> Result<(), AuthError> {
    if token.is_empty() {
        return Err(AuthError::Validation("refreshToken should not be empty".into()));
    }
    Ok(())
}
