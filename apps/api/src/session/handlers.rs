//! Axum route handlers for the results view of a session.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::optimizer::analyzer::regenerate;
use crate::optimizer::handlers::{attachment, RegenerateCvResponse};
use crate::session::SessionSnapshot;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateCvRequest {
    #[serde(rename = "optimizedCV")]
    pub optimized_cv: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateRequest {
    #[serde(default)]
    pub api_key: Option<String>,
}

/// GET /api/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.sessions.get(id)?))
}

/// DELETE /api/sessions/:id
pub async fn handle_clear_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.clear(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/sessions/:id/cv
///
/// Saves the user's manual edits to the optimized CV.
pub async fn handle_update_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCvRequest>,
) -> Result<StatusCode, AppError> {
    state.sessions.update_cv(id, request.optimized_cv)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/regenerate
///
/// Rewrites the session's current CV. Only one regeneration per session may
/// be in flight; a second request gets 409. On failure the CV is unchanged.
pub async fn handle_regenerate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<RegenerateRequest>>,
) -> Result<Json<RegenerateCvResponse>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let credential = state.credential(request.api_key.as_deref())?;

    let ticket = state.sessions.begin_regeneration(id)?;
    let optimized_cv =
        regenerate(state.completer.as_ref(), &credential, ticket.current_cv()).await?;
    ticket.commit(optimized_cv.clone())?;

    info!("Session {id} CV replaced by regeneration");
    Ok(Json(RegenerateCvResponse { optimized_cv }))
}

/// GET /api/sessions/:id/download
pub async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.sessions.get(id)?;
    Ok(attachment(snapshot.optimized_cv))
}
