//! HTTP API for the Docent service.
//!
//! This module provides the REST API endpoints for:
//! - Health and metrics monitoring
//! - Registration, login and logout
//! - Owner-scoped document management
//! - Question answering over a document

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{I18nError, ServiceError};
use crate::service::DocentService;

pub mod accounts;
pub mod ask;
pub mod auth;
pub mod documents;

use accounts::{login_handler, logout_handler, register_handler};
use ask::ask_handler;
use documents::{
    create_document_handler, delete_document_handler, get_document_handler,
    list_documents_handler, patch_document_handler, replace_document_handler,
};

/// Application state
pub struct AppState {
    pub service: Arc<DocentService>,
    pub start_time: Instant,
    /// Prometheus handle; absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create an i18n-aware error from a service error
    pub fn i18n_error(&self, error: ServiceError) -> I18nError {
        I18nError::new(error, self.service.i18n.clone())
    }

    /// Unwrap a JSON body, reporting malformed input as a bad request
    pub fn json_body<T>(&self, payload: Result<Json<T>, JsonRejection>) -> Result<T, I18nError> {
        payload
            .map(|Json(body)| body)
            .map_err(|rejection| self.i18n_error(self.rejection_error(rejection)))
    }

    /// Map a body rejection to a service error, keeping the size-limit status
    pub fn rejection_error(&self, rejection: JsonRejection) -> ServiceError {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServiceError::PayloadTooLarge {
                limit: self.service.config.limits.max_document_size_bytes,
            }
        } else {
            ServiceError::InvalidRequest {
                message: rejection.body_text(),
            }
        }
    }
}

/// Build the API router
pub fn router(service: Arc<DocentService>, metrics: Option<PrometheusHandle>) -> Router {
    let max_body_size = service.config.limits.max_document_size_bytes as usize;

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
        metrics,
    });

    // Mirrors the request origin and allows credentials for the browser frontend
    let cors = CorsLayer::very_permissive();

    let api_routes = Router::new()
        // Account endpoints
        .route("/register/", post(register_handler))
        .route("/token/", post(login_handler))
        .route("/logout/", post(logout_handler))
        // Document endpoints
        .route(
            "/documents/",
            get(list_documents_handler).post(create_document_handler),
        )
        .route(
            "/documents/{id}/",
            get(get_document_handler)
                .put(replace_document_handler)
                .patch(patch_document_handler)
                .delete(delete_document_handler),
        )
        // Question answering
        .route("/ask/", post(ask_handler))
        .layer(DefaultBodyLimit::max(max_body_size));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ollama_healthy = state.service.llm.health_check().await.unwrap_or(false);

    let status = if ollama_healthy {
        state.service.i18n.get("health-status-healthy", None)
    } else {
        state
            .service
            .i18n
            .format("health-status-degraded", &[("reason", "Ollama unavailable")])
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        ollama_available: ollama_healthy,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    ollama_available: bool,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
