//! Tolerant Response Decoder — pulls one JSON object out of a free-text
//! completion and validates it as an `AnalysisResult`.
//!
//! The model is told to return bare JSON but routinely wraps it in prose or
//! code fences. Extraction takes everything from the first `{` to the last
//! `}` after fences are removed. A stray JSON fragment before or after the
//! real object will widen that window; this is accepted, not repaired.

use serde_json::Value;
use thiserror::Error;

use crate::models::analysis::AnalysisResult;

const FENCE: &str = "```";
const FENCE_TAG: &str = "json";

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("No JSON object found in model response")]
    NoJsonFound,

    #[error("Model response contained malformed JSON: {0}")]
    MalformedJson(String),

    #[error("Model response did not match the expected result shape: {0}")]
    SchemaMismatch(String),
}

/// Decodes a raw analysis completion.
pub fn decode(raw: &str) -> Result<AnalysisResult, DecodeError> {
    let value = extract_json_object(raw)?;
    validate(value)
}

/// Steps 1–5: strip fences, bracket the object, parse it.
pub fn extract_json_object(raw: &str) -> Result<Value, DecodeError> {
    let cleaned = strip_code_fences(raw);
    let cleaned = cleaned.trim();

    let first = cleaned.find('{').ok_or(DecodeError::NoJsonFound)?;
    let last = cleaned.rfind('}').ok_or(DecodeError::NoJsonFound)?;
    if last <= first {
        return Err(DecodeError::NoJsonFound);
    }

    serde_json::from_str::<Value>(&cleaned[first..=last])
        .map_err(|e| DecodeError::MalformedJson(e.to_string()))
}

/// Step 6: every field present with the right type, scores within 0 – 100.
fn validate(value: Value) -> Result<AnalysisResult, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::SchemaMismatch(
            "expected a JSON object".to_string(),
        ));
    }

    let result: AnalysisResult = serde_json::from_value(value)
        .map_err(|e| DecodeError::SchemaMismatch(e.to_string()))?;

    if let Some((field, score)) = result.out_of_range_score() {
        return Err(DecodeError::SchemaMismatch(format!(
            "{field} must be between 0 and 100, got {score}"
        )));
    }

    Ok(result)
}

/// Removes every "```" marker, plus a directly following `json` tag in any
/// ASCII case. Any other text after a marker is kept.
fn strip_code_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find(FENCE) {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + FENCE.len()..];
        rest = match after.get(..FENCE_TAG.len()) {
            Some(tag) if tag.eq_ignore_ascii_case(FENCE_TAG) => &after[FENCE_TAG.len()..],
            _ => after,
        };
    }
    out.push_str(rest);
    out
}
