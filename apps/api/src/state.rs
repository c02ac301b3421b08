use std::sync::Arc;

use crate::config::Config;
use crate::credentials::{self, Credential};
use crate::errors::AppError;
use crate::llm_client::Completer;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Model client. `LlmClient` in production; swapped for a scripted one in tests.
    pub completer: Arc<dyn Completer>,
    pub sessions: SessionStore,
    pub config: Config,
}

impl AppState {
    pub fn new(completer: Arc<dyn Completer>, config: Config) -> Self {
        Self {
            completer,
            sessions: SessionStore::new(),
            config,
        }
    }

    /// Resolves the credential for one call under the configured policy.
    pub fn credential(&self, supplied: Option<&str>) -> Result<Credential, AppError> {
        credentials::resolve(
            self.config.credential_mode,
            supplied,
            self.config.groq_api_key.as_ref(),
        )
        .map_err(AppError::from)
    }
}
