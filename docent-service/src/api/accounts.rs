//! Account API endpoints.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::I18nError;
use crate::service::IssuedToken;

use super::AppState;
use super::auth::AuthUser;

/// Registration and login body
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A newly registered user; the password is never echoed back
#[derive(Serialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
}

/// Register a new account
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisteredUser>), I18nError> {
    let request = state.json_body(payload)?;

    let user = state
        .service
        .register_user(request.username.as_deref(), request.password.as_deref())
        .await
        .map_err(|e| state.i18n_error(e))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            id: user.id,
            username: user.username,
        }),
    ))
}

/// Exchange credentials for a bearer token
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<IssuedToken>, I18nError> {
    let request = state.json_body(payload)?;

    let token = state
        .service
        .login(request.username.as_deref(), request.password.as_deref())
        .await
        .map_err(|e| state.i18n_error(e))?;

    Ok(Json(token))
}

/// Revoke the presented bearer token
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<StatusCode, I18nError> {
    state
        .service
        .logout(&user.token)
        .map_err(|e| state.i18n_error(e))?;
    Ok(StatusCode::NO_CONTENT)
}
