//! `hjk kill` / `stop` / `rm` / `recreate`.

use std::io::Write;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use hjk_engine::InstanceManager;

use crate::exit_error::ExitError;

/// Split `branch/session` on the LAST `/` so branch names like
/// `feat/auth` survive.
pub fn split_kill_target(target: &str) -> Result<(&str, &str), ExitError> {
    match target.rsplit_once('/') {
        Some((branch, session)) if !branch.is_empty() && !session.is_empty() => {
            Ok((branch, session))
        }
        _ => Err(ExitError::new(2, format!("invalid target '{}'", target))
            .with_hint("expected <branch>/<session>, e.g. `hjk kill feat/auth/debug-shell`")),
    }
}

pub async fn kill(
    mgr: &InstanceManager,
    cwd: &Path,
    target: &str,
    cancel: &CancellationToken,
) -> Result<(), ExitError> {
    let (branch, session) = split_kill_target(target)?;
    mgr.kill_session(cwd, branch, session, cancel).await?;
    println!("killed {}/{}", branch, session);
    Ok(())
}

pub async fn stop(
    mgr: &InstanceManager,
    cwd: &Path,
    branch: &str,
    cancel: &CancellationToken,
) -> Result<(), ExitError> {
    let entry = mgr.stop(cwd, branch, cancel).await?;
    println!("stopped {} (worktree kept at {})", branch, entry.worktree.display());
    Ok(())
}

pub async fn rm(
    mgr: &InstanceManager,
    cwd: &Path,
    branch: &str,
    force: bool,
    cancel: &CancellationToken,
) -> Result<(), ExitError> {
    if !force && !confirm(&format!("remove instance for '{}' (worktree and logs)?", branch))? {
        println!("aborted");
        return Ok(());
    }
    mgr.remove(cwd, branch, cancel).await?;
    println!("removed {}", branch);
    Ok(())
}

pub async fn recreate(
    mgr: &InstanceManager,
    cwd: &Path,
    branch: &str,
    image: Option<&str>,
    cancel: &CancellationToken,
) -> Result<(), ExitError> {
    let entry = mgr.recreate(cwd, branch, image, cancel).await?;
    println!("recreated {} (container {})", branch, short_id(&entry.container_id));
    Ok(())
}

fn short_id(id: &str) -> &str {
    if id.len() > 12 {
        &id[..12]
    } else {
        id
    }
}

fn confirm(question: &str) -> Result<bool, ExitError> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
