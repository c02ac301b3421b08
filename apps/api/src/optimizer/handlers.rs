//! Axum route handlers for analysis, stateless regeneration and download.

use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::AnalysisResult;
use crate::optimizer::analyzer::{analyze, regenerate};
use crate::optimizer::job_source::fetch_job_description;
use crate::optimizer::prompts::AnalysisInput;
use crate::state::AppState;

pub const DOWNLOAD_FILE_NAME: &str = "optimized-cv.txt";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub cv_text: String,
    #[serde(default)]
    pub experience_summary: String,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub job_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Present when a new analysis should replace an existing session's result.
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub session_id: Uuid,
    pub result: AnalysisResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateCvRequest {
    #[serde(rename = "currentCV")]
    pub current_cv: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegenerateCvResponse {
    #[serde(rename = "optimizedCV")]
    pub optimized_cv: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadCvRequest {
    pub cv_content: String,
}

#[derive(Debug, Deserialize)]
pub struct FetchJobDescriptionRequest {
    pub url: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/analyze
///
/// Runs one analysis and stores the result in a (new or replaced) session.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    run_analysis(&state, request).await.map(Json)
}

/// POST /api/analyze/upload
///
/// Multipart variant: the CV arrives as a file (`cv`) and is read as text.
/// Other fields use the same names as the JSON body.
pub async fn handle_analyze_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut request = AnalyzeRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "cv" {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read CV file: {e}")))?;
            request.cv_text = String::from_utf8_lossy(&data).into_owned();
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read field '{name}': {e}")))?;
        match name.as_str() {
            "experienceSummary" => request.experience_summary = value,
            "jobDescription" => request.job_description = Some(value),
            "jobUrl" => request.job_url = Some(value),
            "apiKey" => request.api_key = Some(value),
            "sessionId" if !value.trim().is_empty() => {
                let id = value
                    .trim()
                    .parse::<Uuid>()
                    .map_err(|_| AppError::Validation("sessionId must be a UUID".to_string()))?;
                request.session_id = Some(id);
            }
            _ => {}
        }
    }

    run_analysis(&state, request).await.map(Json)
}

/// POST /api/fetch-job-description
pub async fn handle_fetch_job_description(
    Json(request): Json<FetchJobDescriptionRequest>,
) -> Result<Json<String>, AppError> {
    fetch_job_description(&request.url).await.map(Json)
}

/// POST /api/regenerate-cv
///
/// Stateless regeneration of caller-supplied CV text.
pub async fn handle_regenerate_cv(
    State(state): State<AppState>,
    Json(request): Json<RegenerateCvRequest>,
) -> Result<Json<RegenerateCvResponse>, AppError> {
    if request.current_cv.trim().is_empty() {
        return Err(AppError::Validation("currentCV cannot be empty".to_string()));
    }

    let credential = state.credential(request.api_key.as_deref())?;
    let optimized_cv =
        regenerate(state.completer.as_ref(), &credential, &request.current_cv).await?;

    Ok(Json(RegenerateCvResponse { optimized_cv }))
}

/// POST /api/download-cv
pub async fn handle_download_cv(Json(request): Json<DownloadCvRequest>) -> impl IntoResponse {
    attachment(request.cv_content)
}

/// Wraps CV text as a downloadable plain-text file.
pub fn attachment(content: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOWNLOAD_FILE_NAME}\""),
            ),
        ],
        content,
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Shared pipeline
// ────────────────────────────────────────────────────────────────────────────

async fn run_analysis(
    state: &AppState,
    request: AnalyzeRequest,
) -> Result<AnalyzeResponse, AppError> {
    let job_description = request
        .job_description
        .filter(|jd| !jd.trim().is_empty());
    let job_url = request.job_url.filter(|url| !url.trim().is_empty());

    let missing_fields = || AppError::Validation("Please fill in all required fields".to_string());
    if request.cv_text.trim().is_empty() || request.experience_summary.trim().is_empty() {
        return Err(missing_fields());
    }

    let job_description = match (job_description, job_url) {
        (Some(jd), _) => jd,
        (None, Some(url)) => fetch_job_description(&url).await?,
        (None, None) => return Err(missing_fields()),
    };

    let credential = state.credential(request.api_key.as_deref())?;

    // Fail before spending a model call on a session that does not exist.
    if let Some(id) = request.session_id {
        state.sessions.get(id)?;
    }

    let input = AnalysisInput {
        cv_text: request.cv_text,
        experience_summary: request.experience_summary,
        job_description,
    };
    let result = analyze(state.completer.as_ref(), &credential, &input).await?;

    let session_id = match request.session_id {
        Some(id) => {
            state.sessions.replace(id, result.clone())?;
            id
        }
        None => state.sessions.create(result.clone()),
    };
    info!("Analysis stored in session {session_id}");

    Ok(AnalyzeResponse { session_id, result })
}
