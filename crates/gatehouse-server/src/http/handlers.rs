//! REST handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{Method, StatusCode, Uri};
use serde::Deserialize;
use serde_json::{Value, json};

use super::error::ApiError;
use super::extract::{AppJson, ClientMeta, CurrentUser};
use super::routes::AppState;
use super::validation::{
    validate_email, validate_login_password, validate_password, validate_refresh_token,
};
use crate::auth::TokenPair;
use crate::service::{AuthResponse, UserProfile};

/// Body of register and login. Unknown fields are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout reads the token and ignores everything else.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogoutRequest {
    refresh_token: Option<String>,
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    AppJson(req): AppJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    let resp = state.auth.register(&req.email, &req.password, client).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    AppJson(req): AppJson<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // The password policy is a registration rule; a short wrong password is
    // just a bad credential here.
    validate_email(&req.email)?;
    validate_login_password(&req.password)?;
    let resp = state.auth.login(&req.email, &req.password, client).await?;
    Ok(Json(resp))
}

/// `POST /auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    validate_refresh_token(&req.refresh_token)?;
    let pair = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(pair))
}

/// `POST /auth/logout`: always 204, whatever the body holds.
pub async fn logout(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let token = body
        .ok()
        .and_then(|bytes| serde_json::from_slice::<LogoutRequest>(&bytes).ok())
        .and_then(|req| req.refresh_token);

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        state.auth.logout(&token).await;
    }
    StatusCode::NO_CONTENT
}

/// `POST /auth/logout-all`: revoke every session of the caller.
pub async fn logout_all(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.auth.logout_all(&user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /users/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        format!("Cannot {method} {}", uri.path()),
    )
}
