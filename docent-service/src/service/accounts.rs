//! Registration, login and token authentication.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, info};

use crate::credentials::{
    generate_token, hash_password, hash_token, validate_password, validate_username,
    verify_password,
};
use crate::db::User;
use crate::error::{AuthFailure, ServiceError, ServiceResult, ValidationErrors, ValidationIssue};

use super::DocentService;

/// A freshly issued bearer token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

impl DocentService {
    /// Validate and create a new account.
    ///
    /// All field problems are collected and reported together. The password
    /// is stored only as an argon2 hash.
    pub async fn register_user(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> ServiceResult<User> {
        let mut errors = ValidationErrors::new();

        let username = match required_field(&mut errors, "username", username) {
            Some(candidate) => match validate_username(candidate) {
                Err(issue) => {
                    errors.add("username", issue);
                    None
                }
                Ok(()) if self.db.username_exists(candidate)? => {
                    errors.add("username", ValidationIssue::UsernameExists);
                    None
                }
                Ok(()) => Some(candidate),
            },
            None => None,
        };

        let password = match required_field(&mut errors, "password", password) {
            Some(candidate) => match validate_password(candidate) {
                Err(issue) => {
                    errors.add("password", issue);
                    None
                }
                Ok(()) => Some(candidate),
            },
            None => None,
        };

        // Every missing value has recorded at least one issue
        let (Some(username), Some(password)) = (username, password) else {
            counter!("docent_registrations_total", "outcome" => "rejected").increment(1);
            return Err(ServiceError::Validation(errors));
        };

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::Internal {
                message: format!("Password hashing task failed: {}", e),
            })??;

        let Some(user) = self.db.insert_user(username, &password_hash)? else {
            // Lost a race with a concurrent registration of the same name
            counter!("docent_registrations_total", "outcome" => "rejected").increment(1);
            let mut errors = ValidationErrors::new();
            errors.add("username", ValidationIssue::UsernameExists);
            return Err(ServiceError::Validation(errors));
        };

        counter!("docent_registrations_total", "outcome" => "created").increment(1);
        info!(user_id = user.id, username = %user.username, "Registered user");

        Ok(user)
    }

    /// Verify credentials and issue a bearer token
    pub async fn login(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> ServiceResult<IssuedToken> {
        let mut errors = ValidationErrors::new();
        let username = required_field(&mut errors, "username", username);
        let password = required_field(&mut errors, "password", password);
        let (Some(username), Some(password)) = (username, password) else {
            return Err(ServiceError::Validation(errors));
        };

        let bad_credentials = || {
            counter!("docent_logins_total", "outcome" => "rejected").increment(1);
            ServiceError::Unauthorized {
                reason: AuthFailure::BadCredentials,
            }
        };

        let Some(user) = self.db.get_user_by_username(username)? else {
            debug!(username = %username, "Login for unknown user");
            return Err(bad_credentials());
        };

        let password = password.to_string();
        let stored_hash = user.password_hash.clone();
        let verified =
            tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
                .await
                .map_err(|e| ServiceError::Internal {
                    message: format!("Password verification task failed: {}", e),
                })??;

        if !verified {
            debug!(user_id = user.id, "Login with wrong password");
            return Err(bad_credentials());
        }

        let token = generate_token();
        let now = Utc::now();
        let expires_at = self.config.auth.token_expiry(now)?;
        self.db
            .insert_session(&hash_token(&token), user.id, now, expires_at)?;

        counter!("docent_logins_total", "outcome" => "success").increment(1);
        info!(user_id = user.id, "Issued access token");

        Ok(IssuedToken {
            access: token,
            token_type: "Bearer",
            expires_at,
        })
    }

    /// Resolve a bearer token to the id of the user it was issued to
    pub fn authenticate(&self, token: &str) -> ServiceResult<i64> {
        let session = self
            .db
            .get_session(&hash_token(token))?
            .ok_or(ServiceError::Unauthorized {
                reason: AuthFailure::InvalidToken,
            })?;

        if session.is_expired(Utc::now()) {
            return Err(ServiceError::Unauthorized {
                reason: AuthFailure::InvalidToken,
            });
        }

        Ok(session.user_id)
    }

    /// Revoke a bearer token
    pub fn logout(&self, token: &str) -> ServiceResult<()> {
        self.db.delete_session(&hash_token(token))?;
        Ok(())
    }

    /// Remove expired sessions, returning how many were deleted
    pub fn cleanup_expired_sessions(&self) -> ServiceResult<usize> {
        self.db.delete_expired_sessions(Utc::now())
    }
}

/// The value of a required field, recording an issue if it is absent or empty
fn required_field<'a>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    match value {
        None => {
            errors.add(field, ValidationIssue::Required);
            None
        }
        Some("") => {
            errors.add(field, ValidationIssue::Blank);
            None
        }
        Some(value) => Some(value),
    }
}
