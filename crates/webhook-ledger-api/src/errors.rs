//! Error types for the API service.

use crate::{config::ConfigError, metrics::WebhookOutcome, responses::StatusResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use webhook_ledger_core::{EventLogError, SignatureError};

/// Message used whenever internal details must not reach the caller
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Failures while ingesting a webhook delivery
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("No payload received")]
    EmptyPayload,

    #[error("Invalid JSON payload: {message}")]
    MalformedPayload { message: String },

    #[error("Missing key in payload: {field}")]
    MissingField { field: String },

    #[error("Failed to store event: {0}")]
    Storage(#[from] EventLogError),
}

impl WebhookHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Signature(e) if e.is_client_error() => StatusCode::FORBIDDEN,
            Self::Signature(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::EmptyPayload | Self::MalformedPayload { .. } | Self::MissingField { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn outcome(&self) -> WebhookOutcome {
        match self {
            Self::Signature(e) if e.is_client_error() => WebhookOutcome::Rejected,
            Self::Signature(_) => WebhookOutcome::InternalError,
            Self::EmptyPayload | Self::MalformedPayload { .. } => WebhookOutcome::Malformed,
            Self::MissingField { .. } => WebhookOutcome::Invalid,
            Self::Storage(_) => WebhookOutcome::StoreError,
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Signature(e) if !e.is_client_error() => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        };

        (status, Json(StatusResponse::error(message))).into_response()
    }
}

/// Failures while serving `GET /events`
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Error fetching events: {0}")]
    Store(#[from] EventLogError),
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StatusResponse::error(self.to_string())),
        )
            .into_response()
    }
}
