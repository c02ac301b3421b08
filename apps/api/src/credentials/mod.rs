//! Credential custody — decides which bearer token authenticates a model call.
//!
//! One core serves both deployment shapes: callers holding their own key
//! (browser-entered) and deployments holding a server-side key.

pub mod handlers;

use std::fmt;
use std::str::FromStr;

use crate::llm_client::LlmError;

/// Opaque bearer token for the model provider. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Where a request's credential may come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialMode {
    /// Only the key sent with the request.
    Client,
    /// Only the key from deployment configuration.
    Server,
    /// Request key if present, otherwise the configured key.
    #[default]
    Either,
}

impl FromStr for CredentialMode {
    type Err = UnknownCredentialMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(CredentialMode::Client),
            "server" => Ok(CredentialMode::Server),
            "either" => Ok(CredentialMode::Either),
            other => Err(UnknownCredentialMode(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown credential mode '{0}'")]
pub struct UnknownCredentialMode(String);

/// Picks the credential for one call according to `mode`.
pub fn resolve(
    mode: CredentialMode,
    supplied: Option<&str>,
    server: Option<&Credential>,
) -> Result<Credential, LlmError> {
    let supplied = supplied
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Credential::new);
    let server = server.filter(|c| !c.is_blank()).cloned();

    let resolved = match mode {
        CredentialMode::Client => supplied,
        CredentialMode::Server => server,
        CredentialMode::Either => supplied.or(server),
    };

    resolved.ok_or_else(|| LlmError::Auth("API key is required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_either_prefers_supplied_key() {
        let server = Credential::new("gsk_server");
        let resolved = resolve(CredentialMode::Either, Some("gsk_client"), Some(&server)).unwrap();
        assert_eq!(resolved.expose(), "gsk_client");
    }

    #[test]
    fn test_either_falls_back_to_server_key_when_supplied_blank() {
        let server = Credential::new("gsk_server");
        let resolved = resolve(CredentialMode::Either, Some("   "), Some(&server)).unwrap();
        assert_eq!(resolved.expose(), "gsk_server");
    }

    #[test]
    fn test_client_mode_ignores_server_key() {
        let server = Credential::new("gsk_server");
        let err = resolve(CredentialMode::Client, None, Some(&server)).unwrap_err();
        assert!(matches!(err, LlmError::Auth(_)));
    }

    #[test]
    fn test_server_mode_ignores_supplied_key() {
        let err = resolve(CredentialMode::Server, Some("gsk_client"), None).unwrap_err();
        assert!(matches!(err, LlmError::Auth(_)));

        let server = Credential::new("gsk_server");
        let resolved = resolve(CredentialMode::Server, Some("gsk_client"), Some(&server)).unwrap();
        assert_eq!(resolved.expose(), "gsk_server");
    }

    #[test]
    fn test_supplied_key_is_trimmed() {
        let resolved = resolve(CredentialMode::Client, Some("  gsk_abc \n"), None).unwrap();
        assert_eq!(resolved.expose(), "gsk_abc");
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let credential = Credential::new("gsk_secret_value");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("gsk_secret_value"));
    }

    #[test]
    fn test_credential_mode_parses_case_insensitively() {
        assert_eq!("Server".parse::<CredentialMode>().unwrap(), CredentialMode::Server);
        assert_eq!(" client ".parse::<CredentialMode>().unwrap(), CredentialMode::Client);
        assert!("browser".parse::<CredentialMode>().is_err());
        assert_eq!(CredentialMode::default(), CredentialMode::Either);
    }
}
