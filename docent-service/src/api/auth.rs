//! Bearer-token authentication extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use std::sync::Arc;

use crate::error::{AuthFailure, I18nError, ServiceError};

use super::AppState;

/// The user a request is authenticated as.
///
/// Extracting this rejects the request with 401 unless it carries a valid,
/// unexpired `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = I18nError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    state.i18n_error(ServiceError::Unauthorized {
                        reason: AuthFailure::MissingToken,
                    })
                })?;

        let token = bearer.token().to_string();
        let user_id = state
            .service
            .authenticate(&token)
            .map_err(|e| state.i18n_error(e))?;

        Ok(Self { user_id, token })
    }
}
