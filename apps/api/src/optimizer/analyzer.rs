//! Analysis pipeline — one model call per operation.
//!
//! analyze:    truncate → analysis prompt → complete → decode
//! regenerate: regeneration prompt → complete → raw text is the new CV

use tracing::{info, warn};

use crate::credentials::Credential;
use crate::errors::AppError;
use crate::llm_client::Completer;
use crate::models::analysis::AnalysisResult;
use crate::optimizer::decoder::decode;
use crate::optimizer::prompts::{build_analysis_prompt, build_regeneration_prompt, AnalysisInput};

/// Token budget for the analysis completion.
pub const ANALYSIS_MAX_TOKENS: u32 = 1500;
/// Token budget for the regeneration completion.
pub const REGENERATION_MAX_TOKENS: u32 = 1800;

pub async fn analyze(
    completer: &dyn Completer,
    credential: &Credential,
    input: &AnalysisInput,
) -> Result<AnalysisResult, AppError> {
    let prompt = build_analysis_prompt(input);
    info!(
        "Requesting analysis: cv_chars={}, summary_chars={}, jd_chars={}",
        input.cv_text.chars().count(),
        input.experience_summary.chars().count(),
        input.job_description.chars().count()
    );

    let raw = completer
        .complete(&prompt, ANALYSIS_MAX_TOKENS, credential)
        .await?;

    let result = decode(&raw).map_err(|e| {
        warn!("Analysis completion could not be decoded: {e}");
        AppError::Decode(e)
    })?;

    info!(
        "Analysis decoded: ats_score={}, match_score={}, missing_keywords={}",
        result.ats_score,
        result.match_score,
        result.missing_keywords.len()
    );
    Ok(result)
}

/// Returns the replacement CV text; scores are not recomputed.
pub async fn regenerate(
    completer: &dyn Completer,
    credential: &Credential,
    current_cv: &str,
) -> Result<String, AppError> {
    let prompt = build_regeneration_prompt(current_cv);
    let improved = completer
        .complete(&prompt, REGENERATION_MAX_TOKENS, credential)
        .await?;

    info!(
        "CV regenerated: {} -> {} chars",
        current_cv.chars().count(),
        improved.chars().count()
    );
    Ok(improved)
}
