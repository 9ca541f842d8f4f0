//! `hjk logs`: print or follow a session's log.

use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use hjk_engine::InstanceManager;
use hjk_storage::{LogReader, DEFAULT_TAIL_LINES};

use crate::exit_error::ExitError;

const FOLLOW_POLL: Duration = Duration::from_millis(100);

#[allow(clippy::too_many_arguments)]
pub async fn handle(
    mgr: &InstanceManager,
    cwd: &Path,
    branch: &str,
    session: &str,
    follow: bool,
    lines: Option<usize>,
    full: bool,
    cancel: &CancellationToken,
) -> Result<(), ExitError> {
    let entry = mgr.instance(cwd, branch, cancel).await?;
    let record = entry.session_by_name(session).ok_or_else(|| {
        ExitError::new(1, format!("no session '{}' in branch '{}'", session, branch))
            .with_hint(format!("`hjk ps {}` lists its sessions", branch))
    })?;

    let reader = LogReader::new(mgr.logs(), &entry.id, &record.id);
    if !mgr.logs().log_exists(&entry.id, &record.id) {
        return Err(ExitError::new(
            1,
            format!("no log recorded yet for '{}/{}'", branch, session),
        ));
    }

    let n = lines.unwrap_or(DEFAULT_TAIL_LINES);
    if follow {
        let mut stdout = std::io::stdout();
        reader.follow_with_history(n, FOLLOW_POLL, cancel, &mut stdout).await?;
        return Ok(());
    }

    let lines = if full { reader.read_all()? } else { reader.read_last_n(n)? };
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
