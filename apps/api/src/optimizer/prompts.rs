// Prompt templates for analysis and regeneration.
// Builders are plain interpolation; the only sanitizing applied is truncation.

use crate::optimizer::truncate::truncate;

/// Character budgets applied to each analysis input.
pub const CV_BUDGET: usize = 6000;
pub const EXPERIENCE_BUDGET: usize = 1000;
pub const JOB_DESCRIPTION_BUDGET: usize = 3000;

/// Analysis prompt template. Replace `{cv_text}`, `{experience_summary}`,
/// `{job_description}` before sending.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are an expert resume writer.

Analyse the candidate's CV vs the Job Description and then produce an optimised, ATS-friendly CV.

Return STRICT JSON matching exactly this shape (no markdown, no code fences, no text before or after the object):

{
  "atsScore": <integer 0-100>,
  "matchScore": <integer 0-100>,
  "missingKeywords": [string],
  "suggestions": [string],
  "keywordDensity": { "keyword": percentNumber },
  "optimizedCV": "<the full rewritten CV>"
}

--- INPUTS (some truncated) ---

CV:
{cv_text}

Experience Summary:
{experience_summary}

Job Description:
{job_description}"#;

/// Regeneration prompt template. Replace `{current_cv}` before sending.
pub const REGENERATION_PROMPT_TEMPLATE: &str = r#"Please improve and refine this CV to make it even more ATS-friendly and professional:

Current CV:
{current_cv}

Improvements to make:
1. Better keyword optimization
2. Improved formatting for ATS systems
3. Stronger action verbs and quantified achievements
4. Better section organization
5. More compelling professional summary

Keep every fact from the original: employers, dates, titles, education and figures must not change.
Return only the improved CV as plain text. Do NOT wrap it in JSON or markdown code fences."#;

/// Raw inputs for one analysis, before truncation.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub cv_text: String,
    pub experience_summary: String,
    pub job_description: String,
}

pub fn build_analysis_prompt(input: &AnalysisInput) -> String {
    // Single pass so interpolated text is never re-scanned for placeholders.
    let cv_text = truncate(&input.cv_text, CV_BUDGET);
    let experience_summary = truncate(&input.experience_summary, EXPERIENCE_BUDGET);
    let job_description = truncate(&input.job_description, JOB_DESCRIPTION_BUDGET);

    let mut prompt = String::with_capacity(
        ANALYSIS_PROMPT_TEMPLATE.len()
            + cv_text.len()
            + experience_summary.len()
            + job_description.len(),
    );
    let mut rest = ANALYSIS_PROMPT_TEMPLATE;
    for (placeholder, value) in [
        ("{cv_text}", cv_text.as_str()),
        ("{experience_summary}", experience_summary.as_str()),
        ("{job_description}", job_description.as_str()),
    ] {
        if let Some((before, after)) = rest.split_once(placeholder) {
            prompt.push_str(before);
            prompt.push_str(value);
            rest = after;
        }
    }
    prompt.push_str(rest);
    prompt
}

/// The CV is embedded as-is; its line structure is what gets rewritten.
pub fn build_regeneration_prompt(current_cv: &str) -> String {
    REGENERATION_PROMPT_TEMPLATE.replace("{current_cv}", current_cv.trim())
}
