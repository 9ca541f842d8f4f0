//! `hjk auth <agent>`: capture, validate, and store credentials.
//!
//! Gemini and Codex credentials are read from the files their own CLIs
//! write after an out-of-band login; Claude's token (or any API key) is
//! pasted by the user.

use std::io::Write;

use hjk_core::AgentKind;
use hjk_creds::{provider_for, Credential, CredentialKind};
use hjk_engine::InstanceManager;

use crate::exit_error::ExitError;

pub fn handle(mgr: &InstanceManager, agent: &str) -> Result<(), ExitError> {
    let agent = AgentKind::parse(agent).ok_or_else(|| {
        ExitError::new(1, format!("unknown agent '{}'", agent))
            .with_hint("agents: claude, gemini, codex")
    })?;
    let provider = provider_for(agent);

    // File-based capture first (gemini, codex); fall back to a paste.
    if let Some(home) = dirs::home_dir() {
        match provider.capture_subscription_from_home(&home) {
            Ok(Some(credential)) => {
                mgr.creds().save(agent, &credential).map_err(engine_cred)?;
                println!("stored {} subscription credentials", agent);
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                eprintln!("hjk: {}", e);
                eprintln!("  falling back to manual entry");
            }
        }
    }

    let credential = prompt_for_credential(agent)?;
    provider.validate(&credential).map_err(engine_cred)?;
    mgr.creds().save(agent, &credential).map_err(engine_cred)?;
    println!("stored {} {} credential", agent, kind_label(credential.kind));
    Ok(())
}

fn kind_label(kind: CredentialKind) -> &'static str {
    match kind {
        CredentialKind::Subscription => "subscription",
        CredentialKind::ApiKey => "API key",
    }
}

fn engine_cred(e: hjk_creds::CredError) -> ExitError {
    ExitError::new(1, e.to_string())
}

fn prompt_for_credential(agent: AgentKind) -> Result<Credential, ExitError> {
    match agent {
        AgentKind::Claude => {
            eprintln!("Paste a Claude credential:");
            eprintln!("  - OAuth token from `claude setup-token` (sk-ant-...)");
            eprintln!("  - or an API key (sk-ant-api...)");
        }
        AgentKind::Gemini => {
            eprintln!("Paste a Gemini API key (AIza...), or run `gemini` once to log");
            eprintln!("in with Google and re-run `hjk auth gemini`.");
        }
        AgentKind::Codex => {
            eprintln!("Paste an OpenAI API key (sk-...), or run `codex login` and");
            eprintln!("re-run `hjk auth codex`.");
        }
    }
    eprint!("> ");
    std::io::stderr().flush()?;

    let mut value = String::new();
    std::io::stdin().read_line(&mut value)?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ExitError::new(1, "no credential entered"));
    }

    let kind = classify(agent, &value);
    Ok(Credential { kind, value })
}

/// Claude's pasted value may be either form; tell them apart by prefix.
/// Gemini/Codex pastes are always API keys (subscriptions come from files).
fn classify(agent: AgentKind, value: &str) -> CredentialKind {
    match agent {
        AgentKind::Claude if value.starts_with("sk-ant-api") => CredentialKind::ApiKey,
        AgentKind::Claude => CredentialKind::Subscription,
        AgentKind::Gemini | AgentKind::Codex => CredentialKind::ApiKey,
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
