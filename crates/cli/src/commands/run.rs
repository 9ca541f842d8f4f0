//! `hjk run`, `hjk agent`, and `hjk exec`: open sessions.

use std::path::Path;
use tokio_util::sync::CancellationToken;

use hjk_core::{sh_join, AgentKind, SessionKind};
use hjk_engine::{InstanceManager, SessionSpec};

use crate::exit_error::ExitError;

fn parse_agent(name: &str) -> Result<AgentKind, ExitError> {
    AgentKind::parse(name).ok_or_else(|| {
        ExitError::new(1, format!("unknown agent '{}'", name))
            .with_hint("agents: claude, gemini, codex")
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    mgr: &InstanceManager,
    cwd: &Path,
    branch: &str,
    prompt: Option<String>,
    agent: Option<&str>,
    name: Option<String>,
    image: Option<&str>,
    detach: bool,
    cancel: &CancellationToken,
) -> Result<(), ExitError> {
    let kind = match agent {
        Some(agent) => SessionKind::from(parse_agent(agent)?),
        None => SessionKind::from(mgr.settings().default_agent),
    };
    let entry = mgr.ensure_instance(cwd, branch, image, cancel).await?;

    let spec = SessionSpec {
        kind,
        name,
        command_override: None,
        prompt,
        env_extra: Vec::new(),
        detached: detach,
    };
    let (entry, record) = mgr.create_session_in(entry, spec, cancel).await?;
    if detach {
        println!("{} session '{}' started in {} (detached)", kind, record.name, entry.branch);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn agent(
    mgr: &InstanceManager,
    cwd: &Path,
    branch: &str,
    agent: &str,
    prompt: Option<String>,
    name: Option<String>,
    detach: bool,
    cancel: &CancellationToken,
) -> Result<(), ExitError> {
    let kind = SessionKind::from(parse_agent(agent)?);
    let spec = SessionSpec {
        kind,
        name,
        command_override: None,
        prompt,
        env_extra: Vec::new(),
        detached: detach,
    };
    let (entry, record) = mgr.create_session(cwd, branch, spec, cancel).await?;
    if detach {
        println!("{} session '{}' started in {} (detached)", kind, record.name, entry.branch);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn exec(
    mgr: &InstanceManager,
    cwd: &Path,
    branch: &str,
    cmd: Vec<String>,
    no_mux: bool,
    name: Option<String>,
    detach: bool,
    cancel: &CancellationToken,
) -> Result<(), ExitError> {
    if no_mux {
        let interactive = cmd.is_empty();
        let code = mgr.exec_direct(cwd, branch, cmd, interactive, cancel).await?;
        if code != 0 {
            return Err(ExitError::new(code, format!("command exited with code {}", code)));
        }
        return Ok(());
    }

    let spec = SessionSpec {
        kind: SessionKind::Shell,
        name,
        command_override: if cmd.is_empty() { None } else { Some(sh_join(&cmd)) },
        prompt: None,
        env_extra: Vec::new(),
        detached: detach,
    };
    let (entry, record) = mgr.create_session(cwd, branch, spec, cancel).await?;
    if detach {
        println!("shell session '{}' started in {} (detached)", record.name, entry.branch);
    }
    Ok(())
}
