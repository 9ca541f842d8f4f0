//! Injection recipes: turn a stored credential into the env vars and the
//! session-start shell snippet that materialize it inside the container.

use serde::Deserialize;

use hjk_core::AgentKind;

use crate::provider::provider_for;
use crate::store::{CredError, Credential, CredentialKind};

/// What the instance manager applies when starting an agent session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Injection {
    pub env: Vec<(String, String)>,
    /// Shell preamble run in-container before the agent command.
    pub setup: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiBundle {
    oauth_creds: serde_json::Value,
    #[serde(default)]
    google_accounts: serde_json::Value,
}

/// Build the injection for one agent + credential.
pub fn injection_for(agent: AgentKind, credential: &Credential) -> Result<Injection, CredError> {
    let provider = provider_for(agent);
    match credential.kind {
        CredentialKind::ApiKey => Ok(Injection {
            env: vec![(provider.api_key_env_var.to_string(), credential.value.clone())],
            setup: None,
        }),
        CredentialKind::Subscription => match agent {
            AgentKind::Claude => Ok(Injection {
                env: vec![(
                    provider.subscription_env_var.to_string(),
                    credential.value.clone(),
                )],
                // Skip the first-run onboarding prompt so the agent starts
                // straight into the session.
                setup: Some(
                    r#"printf '%s' '{"hasCompletedOnboarding":true}' > "$HOME/.claude.json""#
                        .to_string(),
                ),
            }),
            AgentKind::Gemini => {
                let bundle: GeminiBundle = serde_json::from_str(&credential.value)?;
                let accounts = if bundle.google_accounts.is_null() {
                    "{}".to_string()
                } else {
                    bundle.google_accounts.to_string()
                };
                Ok(Injection {
                    env: vec![
                        (
                            provider.subscription_env_var.to_string(),
                            bundle.oauth_creds.to_string(),
                        ),
                        ("GEMINI_GOOGLE_ACCOUNTS".to_string(), accounts),
                    ],
                    setup: Some(
                        concat!(
                            r#"mkdir -p "$HOME/.gemini""#,
                            r#" && printf '%s' "$GEMINI_OAUTH_CREDS" > "$HOME/.gemini/oauth_creds.json""#,
                            r#" && printf '%s' "$GEMINI_GOOGLE_ACCOUNTS" > "$HOME/.gemini/google_accounts.json""#,
                            r#" && printf '%s' '{"security":{"auth":{"selectedType":"oauth-personal"}}}' > "$HOME/.gemini/settings.json""#,
                        )
                        .to_string(),
                    ),
                })
            }
            AgentKind::Codex => Ok(Injection {
                env: vec![(
                    provider.subscription_env_var.to_string(),
                    credential.value.clone(),
                )],
                setup: Some(
                    r#"mkdir -p "$HOME/.codex" && printf '%s' "$CODEX_AUTH_JSON" > "$HOME/.codex/auth.json""#
                        .to_string(),
                ),
            }),
        },
    }
}

#[cfg(test)]
#[path = "inject_tests.rs"]
mod tests;
