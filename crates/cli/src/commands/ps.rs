//! `hjk ps` (alias `ls`): list instances.

use std::path::Path;
use tokio_util::sync::CancellationToken;

use hjk_engine::{EngineError, InstanceManager};
use hjk_git::GitError;

use crate::exit_error::ExitError;
use crate::output::render_ps_table;

pub async fn handle(
    mgr: &InstanceManager,
    cwd: &Path,
    branch: Option<&str>,
    all: bool,
    json: bool,
    cancel: &CancellationToken,
) -> Result<(), ExitError> {
    let views = if all {
        mgr.list(None, cancel).await?
    } else {
        match mgr.list(Some(cwd), cancel).await {
            Ok(views) => views,
            // Outside a repository, fall back to everything
            Err(EngineError::Git(GitError::NotRepository(_))) => mgr.list(None, cancel).await?,
            Err(e) => return Err(e.into()),
        }
    };

    let views: Vec<_> = match branch {
        Some(branch) => views.into_iter().filter(|v| v.instance.branch == branch).collect(),
        None => views,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&views).map_err(|e| ExitError::new(1, e.to_string()))?
        );
    } else {
        println!("{}", render_ps_table(&views));
    }
    Ok(())
}
