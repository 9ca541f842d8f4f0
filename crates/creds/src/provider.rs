//! Per-agent credential providers: validation rules and capture flows.
//!
//! Capture is deliberately low-tech. Claude's OAuth token is pasted by
//! the user (obtained via `claude setup-token` upstream); Gemini and
//! Codex credentials are read from the files their own CLIs write after
//! the user logs in out-of-band.

use serde::Deserialize;
use std::path::Path;

use hjk_core::AgentKind;

use crate::store::{CredError, Credential, CredentialKind};

/// Static facts about one agent's credential handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub agent: AgentKind,
    /// Env var carrying a subscription credential into the container.
    pub subscription_env_var: &'static str,
    /// Env var carrying an API key into the container.
    pub api_key_env_var: &'static str,
    /// Keyring account name.
    pub keychain_account: &'static str,
    /// Whether session start must write config files in the container.
    pub requires_container_setup: bool,
}

pub fn provider_for(agent: AgentKind) -> Provider {
    match agent {
        AgentKind::Claude => Provider {
            agent,
            subscription_env_var: "CLAUDE_CODE_OAUTH_TOKEN",
            api_key_env_var: "ANTHROPIC_API_KEY",
            keychain_account: "headjack-claude",
            requires_container_setup: true,
        },
        AgentKind::Gemini => Provider {
            agent,
            subscription_env_var: "GEMINI_OAUTH_CREDS",
            api_key_env_var: "GEMINI_API_KEY",
            keychain_account: "headjack-gemini",
            requires_container_setup: true,
        },
        AgentKind::Codex => Provider {
            agent,
            subscription_env_var: "CODEX_AUTH_JSON",
            api_key_env_var: "OPENAI_API_KEY",
            keychain_account: "headjack-codex",
            requires_container_setup: true,
        },
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("{0}")]
    Invalid(#[from] CredError),
    #[error("{path}: {reason}")]
    Unreadable { path: String, reason: String },
}

impl Provider {
    /// Check a credential's shape before storing it.
    pub fn validate(&self, credential: &Credential) -> Result<(), CredError> {
        let invalid = |reason: &str| CredError::AuthInvalid {
            agent: self.agent,
            reason: reason.to_string(),
        };
        match (self.agent, credential.kind) {
            (AgentKind::Claude, CredentialKind::Subscription) => {
                if !credential.value.starts_with("sk-ant-") {
                    return Err(invalid("OAuth tokens start with sk-ant-"));
                }
            }
            (AgentKind::Claude, CredentialKind::ApiKey) => {
                if !credential.value.starts_with("sk-ant-api") {
                    return Err(invalid("API keys start with sk-ant-api"));
                }
            }
            (AgentKind::Gemini, CredentialKind::Subscription) => {
                let blob: GeminiSubscription = serde_json::from_str(&credential.value)
                    .map_err(|e| invalid(&format!("not a credential bundle: {e}")))?;
                if blob.oauth_creds.refresh_token.unwrap_or_default().is_empty() {
                    return Err(invalid("oauth_creds is missing a refresh_token"));
                }
            }
            (AgentKind::Gemini, CredentialKind::ApiKey) => {
                if !credential.value.starts_with("AIza") {
                    return Err(invalid("API keys start with AIza"));
                }
            }
            (AgentKind::Codex, CredentialKind::Subscription) => {
                if serde_json::from_str::<serde_json::Value>(&credential.value).is_err() {
                    return Err(invalid("auth.json contents must be JSON"));
                }
            }
            (AgentKind::Codex, CredentialKind::ApiKey) => {
                if !credential.value.starts_with("sk-") {
                    return Err(invalid("API keys start with sk-"));
                }
            }
        }
        Ok(())
    }

    /// Assemble a subscription credential from the agent's own files under
    /// `home`. Claude has no file-based capture; its token is pasted.
    pub fn capture_subscription_from_home(
        &self,
        home: &Path,
    ) -> Result<Option<Credential>, CaptureError> {
        match self.agent {
            AgentKind::Claude => Ok(None),
            AgentKind::Gemini => {
                let oauth = read_json(&home.join(".gemini").join("oauth_creds.json"))?;
                let accounts =
                    read_json_or_null(&home.join(".gemini").join("google_accounts.json"))?;
                let bundle = serde_json::json!({
                    "oauth_creds": oauth,
                    "google_accounts": accounts,
                });
                let credential = Credential {
                    kind: CredentialKind::Subscription,
                    value: bundle.to_string(),
                };
                self.validate(&credential)?;
                Ok(Some(credential))
            }
            AgentKind::Codex => {
                let path = home.join(".codex").join("auth.json");
                let raw = std::fs::read_to_string(&path).map_err(|e| CaptureError::Unreadable {
                    path: path.display().to_string(),
                    reason: format!("{e} (run `codex login` first)"),
                })?;
                let credential =
                    Credential { kind: CredentialKind::Subscription, value: raw };
                self.validate(&credential)?;
                Ok(Some(credential))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiSubscription {
    oauth_creds: GeminiOauthCreds,
    #[serde(default)]
    #[allow(dead_code)]
    google_accounts: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GeminiOauthCreds {
    refresh_token: Option<String>,
}

fn read_json(path: &Path) -> Result<serde_json::Value, CaptureError> {
    let raw = std::fs::read_to_string(path).map_err(|e| CaptureError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| CaptureError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn read_json_or_null(path: &Path) -> Result<serde_json::Value, CaptureError> {
    if !path.is_file() {
        return Ok(serde_json::Value::Null);
    }
    read_json(path)
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
