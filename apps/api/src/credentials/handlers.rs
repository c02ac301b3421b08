//! Axum route handlers for credential discovery and validation.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::credentials::{Credential, CredentialMode};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckApiKeyResponse {
    pub has_api_key: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateApiKeyRequest {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateApiKeyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /api/check-api-key
///
/// Tells the client whether it needs to ask the user for a key.
pub async fn handle_check_api_key(State(state): State<AppState>) -> Json<CheckApiKeyResponse> {
    let has_api_key = state.config.credential_mode != CredentialMode::Client
        && state.config.has_server_credential();

    Json(CheckApiKeyResponse {
        has_api_key,
        message: if has_api_key {
            "API key is configured".to_string()
        } else {
            "API key is not configured".to_string()
        },
    })
}

/// POST /api/validate-api-key
///
/// Makes one minimal probe call with the candidate key.
pub async fn handle_validate_api_key(
    State(state): State<AppState>,
    Json(request): Json<ValidateApiKeyRequest>,
) -> (StatusCode, Json<ValidateApiKeyResponse>) {
    let candidate = request
        .api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());

    let Some(candidate) = candidate else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ValidateApiKeyResponse {
                valid: false,
                message: None,
                error: Some("API key is required".to_string()),
            }),
        );
    };

    match state.completer.probe(&Credential::new(candidate)).await {
        Ok(()) => {
            info!("API key validated");
            (
                StatusCode::OK,
                Json(ValidateApiKeyResponse {
                    valid: true,
                    message: Some("API key is valid".to_string()),
                    error: None,
                }),
            )
        }
        Err(e) => {
            warn!("API key validation failed: {e}");
            (
                StatusCode::UNAUTHORIZED,
                Json(ValidateApiKeyResponse {
                    valid: false,
                    message: None,
                    error: Some("Invalid API key or API request failed".to_string()),
                }),
            )
        }
    }
}
