//! Question-answering endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{I18nError, ServiceError};

use super::AppState;
use super::auth::AuthUser;

/// A document id as sent by clients: a number or a numeric string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DocumentIdParam {
    Int(i64),
    Str(String),
}

impl DocumentIdParam {
    /// The id, or `None` when it is zero, empty or not an integer
    fn resolve(&self) -> Option<i64> {
        let id = match self {
            DocumentIdParam::Int(id) => *id,
            DocumentIdParam::Str(s) => s.trim().parse().ok()?,
        };
        (id != 0).then_some(id)
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub document_id: Option<DocumentIdParam>,
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Answer a question about one of the caller's documents
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, I18nError> {
    let fields_required = || {
        state.i18n_error(ServiceError::InvalidRequest {
            message: state.service.i18n.get("error-ask-fields-required", None),
        })
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(state.i18n_error(state.rejection_error(rejection)));
        }
        Err(_) => return Err(fields_required()),
    };

    let document_id = request.document_id.as_ref().and_then(DocumentIdParam::resolve);
    let question = request.question.filter(|q| !q.is_empty());
    let (Some(document_id), Some(question)) = (document_id, question) else {
        return Err(fields_required());
    };

    let answer = state
        .service
        .ask(user.user_id, document_id, &question)
        .await
        .map_err(|e| state.i18n_error(e))?;

    Ok(Json(AskResponse { answer }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(json: &str) -> Option<i64> {
        let request: AskRequest = serde_json::from_str(json).unwrap();
        request.document_id.as_ref().and_then(DocumentIdParam::resolve)
    }

    #[test]
    fn test_document_id_forms() {
        assert_eq!(resolve(r#"{"document_id": 7}"#), Some(7));
        assert_eq!(resolve(r#"{"document_id": "7"}"#), Some(7));
        assert_eq!(resolve(r#"{"document_id": 0}"#), None);
        assert_eq!(resolve(r#"{"document_id": ""}"#), None);
        assert_eq!(resolve(r#"{"document_id": "seven"}"#), None);
        assert_eq!(resolve(r#"{"document_id": null}"#), None);
        assert_eq!(resolve(r#"{}"#), None);
    }
}
