//! Job description by URL. Cross-origin job boards cannot be fetched from
//! this deployment, so the lookup always fails with a fixed message and the
//! user is asked to paste the description instead.

use crate::errors::AppError;

pub const UNSUPPORTED_MESSAGE: &str =
    "URL fetching is not available in this deployment. Please copy and paste the job description.";

pub async fn fetch_job_description(url: &str) -> Result<String, AppError> {
    tracing::debug!("Job description fetch requested for {url}; unsupported");
    Err(AppError::Unsupported(UNSUPPORTED_MESSAGE.to_string()))
}
