// CV analysis and regeneration.
// All model calls go through llm_client::Completer — no direct HTTP calls here.

pub mod analyzer;
pub mod decoder;
pub mod handlers;
pub mod job_source;
pub mod prompts;
pub mod truncate;
