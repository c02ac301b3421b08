use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::optimizer::decoder::DecodeError;
use crate::session::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Auth(msg) => AppError::Unauthorized(msg),
            LlmError::Upstream { message, .. } => AppError::Upstream(message),
            LlmError::EmptyCompletion => {
                AppError::Upstream("The model returned an empty response".to_string())
            }
            LlmError::Transport(msg) => AppError::Transport(msg),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => AppError::NotFound(e.to_string()),
            SessionError::Busy(_) => AppError::Conflict(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Upstream(msg) => {
                tracing::warn!("Upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone())
            }
            AppError::Transport(msg) => {
                tracing::error!("Transport error: {msg}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TRANSPORT_ERROR",
                    "Could not reach the AI provider. Please try again.".to_string(),
                )
            }
            AppError::Decode(e) => {
                let code = match e {
                    DecodeError::NoJsonFound => "NO_JSON_FOUND",
                    DecodeError::MalformedJson(_) => "MALFORMED_JSON",
                    DecodeError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
                };
                (StatusCode::BAD_GATEWAY, code, e.to_string())
            }
            AppError::Unsupported(msg) => {
                (StatusCode::NOT_IMPLEMENTED, "UNSUPPORTED", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
