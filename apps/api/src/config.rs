use anyhow::{bail, Context, Result};

use crate::credentials::{Credential, CredentialMode};

const DEFAULT_LLM_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// One week.
const MAX_SESSION_TTL_MINUTES: i64 = 7 * 24 * 60;

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but unparseable.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server-held credential. Optional: without it callers must send their own key.
    pub groq_api_key: Option<Credential>,
    pub llm_api_url: String,
    pub llm_timeout_secs: u64,
    pub credential_mode: CredentialMode,
    pub session_ttl_minutes: i64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let credential_mode = optional_env("CREDENTIAL_MODE")
            .map(|mode| mode.parse::<CredentialMode>())
            .transpose()
            .context("CREDENTIAL_MODE must be one of: client, server, either")?
            .unwrap_or_default();

        Ok(Config {
            groq_api_key: optional_env("GROQ_API_KEY").map(Credential::new),
            llm_api_url: optional_env("LLM_API_URL")
                .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            credential_mode,
            session_ttl_minutes: check_session_ttl(parse_env("SESSION_TTL_MINUTES", 60)?)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn has_server_credential(&self) -> bool {
        self.groq_api_key.is_some()
    }
}

/// Reads a variable, treating unset and blank the same way.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_session_ttl(minutes: i64) -> Result<i64> {
    if !(1..=MAX_SESSION_TTL_MINUTES).contains(&minutes) {
        bail!("SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}, got {minutes}");
    }
    Ok(minutes)
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by handler tests: no server key, client-supplied mode.
    pub fn for_tests() -> Self {
        Config {
            groq_api_key: None,
            llm_api_url: DEFAULT_LLM_API_URL.to_string(),
            llm_timeout_secs: 5,
            credential_mode: CredentialMode::Either,
            session_ttl_minutes: 60,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
