//! Document API endpoints.
//!
//! Every handler requires authentication and only ever touches documents
//! owned by the authenticated user.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;

use crate::db::Document;
use crate::error::I18nError;
use crate::service::DocumentInput;

use super::AppState;
use super::auth::AuthUser;

/// List the caller's documents
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Document>>, I18nError> {
    let documents = state
        .service
        .list_documents(user.user_id)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(documents))
}

/// Create a document owned by the caller
pub async fn create_document_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<DocumentInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), I18nError> {
    let input = state.json_body(payload)?;
    let document = state
        .service
        .create_document(user.user_id, input)
        .map_err(|e| state.i18n_error(e))?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Document>, I18nError> {
    let document = state
        .service
        .get_document(user.user_id, id)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(document))
}

/// Replace title and content
pub async fn replace_document_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    payload: Result<Json<DocumentInput>, JsonRejection>,
) -> Result<Json<Document>, I18nError> {
    let input = state.json_body(payload)?;
    let document = state
        .service
        .replace_document(user.user_id, id, input)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(document))
}

/// Update whichever fields are present
pub async fn patch_document_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    payload: Result<Json<DocumentInput>, JsonRejection>,
) -> Result<Json<Document>, I18nError> {
    let input = state.json_body(payload)?;
    let document = state
        .service
        .patch_document(user.user_id, id, input)
        .map_err(|e| state.i18n_error(e))?;
    Ok(Json(document))
}

pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, I18nError> {
    state
        .service
        .delete_document(user.user_id, id)
        .map_err(|e| state.i18n_error(e))?;
    Ok(StatusCode::NO_CONTENT)
}
