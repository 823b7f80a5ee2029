use std::collections::BTreeMap;
use std::fmt;

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::i18n::I18n;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: String },

    #[error("Authentication failed: {reason}")]
    Unauthorized { reason: AuthFailure },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    Ollama(#[from] OllamaError),

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("Embedding error")]
    Embedding(#[from] EmbeddingError),

    #[error("QA flow error: {message}")]
    Flow { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Why a request could not be authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingToken,
    InvalidToken,
    BadCredentials,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::MissingToken => write!(f, "missing bearer token"),
            AuthFailure::InvalidToken => write!(f, "invalid or expired token"),
            AuthFailure::BadCredentials => write!(f, "bad credentials"),
        }
    }
}

/// Ollama client errors
#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Connection failed to Ollama at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Generation failed (status {status}): {message}")]
    Generation { status: u16, message: String },

    #[error("Invalid response from Ollama")]
    InvalidResponse {
        #[source]
        source: reqwest::Error,
    },
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },
}

/// Embedding errors
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding generation failed: {message}")]
    Generation { message: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// A single field-level validation problem.
///
/// Each variant maps to a Fluent message id so the rendered text can be
/// localized while the variant itself stays matchable in code and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    Required,
    Blank,
    TooLong { max: usize },
    UsernameTooShort,
    InvalidCharacters,
    UsernameExists,
    WeakPassword,
}

impl ValidationIssue {
    pub fn message_id(&self) -> &'static str {
        match self {
            ValidationIssue::Required => "validation-required",
            ValidationIssue::Blank => "validation-blank",
            ValidationIssue::TooLong { .. } => "validation-too-long",
            ValidationIssue::UsernameTooShort => "validation-username-too-short",
            ValidationIssue::InvalidCharacters => "validation-invalid-characters",
            ValidationIssue::UsernameExists => "validation-username-exists",
            ValidationIssue::WeakPassword => "validation-weak-password",
        }
    }

    fn render(&self, i18n: &I18n) -> String {
        match self {
            ValidationIssue::TooLong { max } => {
                i18n.format(self.message_id(), &[("max", &max.to_string())])
            }
            _ => i18n.get(self.message_id(), None),
        }
    }
}

/// Field errors collected during validation, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<ValidationIssue>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, issue: ValidationIssue) {
        self.fields.entry(field.to_string()).or_default().push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[cfg(test)]
    pub fn issues(&self, field: &str) -> &[ValidationIssue] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ok when nothing was collected, otherwise a validation error.
    pub fn into_result(self) -> ServiceResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }

    /// Render as `{"field": ["message", ...]}`
    pub fn to_details(&self, i18n: &I18n) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(field, issues)| {
                let messages = issues
                    .iter()
                    .map(|issue| serde_json::Value::String(issue.render(i18n)))
                    .collect();
                (field.clone(), serde_json::Value::Array(messages))
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ServiceError::Validation(_) | ServiceError::InvalidRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::DocumentNotFound { .. } => "document_not_found",
            ServiceError::Unauthorized { .. } => "unauthorized",
            ServiceError::Validation(_) => "validation_error",
            ServiceError::Ollama(OllamaError::Connection { .. }) => "ollama_connection",
            ServiceError::Ollama(OllamaError::ModelNotFound { .. }) => "ollama_model_not_found",
            ServiceError::Ollama(OllamaError::Generation { .. }) => "ollama_generation",
            ServiceError::Ollama(OllamaError::InvalidResponse { .. }) => "ollama_invalid_response",
            ServiceError::Database(_) => "database_error",
            ServiceError::Embedding(_) => "embedding_error",
            ServiceError::Flow { .. } => "flow_error",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::PayloadTooLarge { .. } => "payload_too_large",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }

    /// Get a user-friendly translated message
    pub fn user_message(&self, i18n: &I18n) -> String {
        match self {
            ServiceError::DocumentNotFound { .. } => i18n.get("error-document-not-found", None),
            ServiceError::Unauthorized {
                reason: AuthFailure::BadCredentials,
            } => i18n.get("error-bad-credentials", None),
            ServiceError::Unauthorized { .. } => i18n.get("error-not-authenticated", None),
            ServiceError::Validation(_) => i18n.get("error-validation", None),
            ServiceError::InvalidRequest { message } => message.clone(),
            ServiceError::PayloadTooLarge { limit } => {
                i18n.format("error-payload-too-large", &[("limit", &limit.to_string())])
            }
            ServiceError::Internal { .. } => i18n.get("error-internal", None),
            // For infrastructure errors, fall back to the technical message
            _ => self.to_string(),
        }
    }

    /// Convert to an error response with i18n support
    pub fn into_response_with_i18n(self, i18n: &I18n) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %format_error_chain(&self), "Request failed");
        }

        let details = match &self {
            ServiceError::Validation(errors) => Some(errors.to_details(i18n)),
            _ => None,
        };

        let response = ErrorResponse {
            message: self.user_message(i18n),
            code: Some(self.error_code().to_string()),
            details,
        };

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], Json(response)).into_response()
        } else {
            (status, Json(response)).into_response()
        }
    }
}

/// Render an error with all of its sources, outermost first
pub fn format_error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error wrapper with i18n support for API responses
pub struct I18nError {
    pub error: ServiceError,
    pub i18n: std::sync::Arc<I18n>,
}

impl I18nError {
    pub fn new(error: ServiceError, i18n: std::sync::Arc<I18n>) -> Self {
        Self { error, i18n }
    }
}

impl IntoResponse for I18nError {
    fn into_response(self) -> Response {
        self.error.into_response_with_i18n(&self.i18n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let not_found = ServiceError::DocumentNotFound {
            document_id: "7".to_string(),
        };
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let unauthorized = ServiceError::Unauthorized {
            reason: AuthFailure::MissingToken,
        };
        assert_eq!(unauthorized.status_code(), StatusCode::UNAUTHORIZED);

        let mut errors = ValidationErrors::new();
        errors.add("username", ValidationIssue::UsernameTooShort);
        assert_eq!(
            ServiceError::Validation(errors).status_code(),
            StatusCode::BAD_REQUEST
        );

        let flow = ServiceError::Flow {
            message: "no answer".to_string(),
        };
        assert_eq!(flow.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_details() {
        let i18n = I18n::new();
        let mut errors = ValidationErrors::new();
        errors.add("username", ValidationIssue::UsernameTooShort);
        errors.add("username", ValidationIssue::InvalidCharacters);
        errors.add("password", ValidationIssue::WeakPassword);

        let details = errors.to_details(&i18n);
        assert_eq!(
            details,
            serde_json::json!({
                "username": ["Username too short", "Invalid characters"],
                "password": ["Weak password"],
            })
        );
    }

    #[test]
    fn test_empty_validation_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
