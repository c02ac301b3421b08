/// LLM Client — the single point of entry for all chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the model provider directly.
/// All model interactions MUST go through the `Completer` trait.
///
/// Models are hardcoded; only the endpoint URL is configurable.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::credentials::Credential;

/// The model used for analysis and regeneration.
pub const MODEL: &str = "llama3-70b-8192";
/// Smaller model used only to check that a credential is accepted.
pub const PROBE_MODEL: &str = "llama3-8b-8192";
const TEMPERATURE: f32 = 0.7;
const PROBE_PROMPT: &str = "ping";
const PROBE_MAX_TOKENS: u32 = 5;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Model returned an empty completion")]
    EmptyCompletion,
}

/// Anything that can turn a prompt into a completion. `LlmClient` is the
/// production implementation; tests substitute a scripted one.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        credential: &Credential,
    ) -> Result<String, LlmError>;

    /// One minimal call confirming the credential is usable.
    async fn probe(&self, credential: &Credential) -> Result<(), LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Chat-completion client for an OpenAI-compatible endpoint (Groq by default).
/// Single attempt per call; no retry.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
}

impl LlmClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint })
    }

    async fn send(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
        credential: &Credential,
    ) -> Result<String, LlmError> {
        if credential.is_blank() {
            return Err(LlmError::Auth("API key is required".to_string()));
        }

        let request_body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential.expose())
            .json(&request_body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = upstream_message(&body);
            warn!("Model API returned {status}: {message}");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth(message),
                _ => LlmError::Upstream {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| LlmError::Upstream {
            status: status.as_u16(),
            message: format!("unreadable completion body: {e}"),
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)?;

        debug!(
            "Model call succeeded: model={model}, prompt_chars={}, completion_chars={}",
            prompt.chars().count(),
            content.chars().count()
        );

        Ok(content)
    }
}

#[async_trait]
impl Completer for LlmClient {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        credential: &Credential,
    ) -> Result<String, LlmError> {
        self.send(MODEL, prompt, max_tokens, credential).await
    }

    async fn probe(&self, credential: &Credential) -> Result<(), LlmError> {
        // A 5-token reply may legitimately be blank; the key was still accepted.
        match self
            .send(PROBE_MODEL, PROBE_PROMPT, PROBE_MAX_TOKENS, credential)
            .await
        {
            Ok(_) | Err(LlmError::EmptyCompletion) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Transport("request to model API timed out".to_string())
    } else {
        LlmError::Transport(e.to_string())
    }
}

/// Prefers the provider's `error.message`, then the raw body.
fn upstream_message(body: &str) -> String {
    if let Ok(api_error) = serde_json::from_str::<ApiError>(body) {
        return api_error.error.message;
    }
    let body = body.trim();
    if body.is_empty() {
        "API request failed".to_string()
    } else {
        body.to_string()
    }
}
