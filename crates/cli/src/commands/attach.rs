//! `hjk attach`: MRU session attach.

use std::path::Path;
use tokio_util::sync::CancellationToken;

use hjk_engine::InstanceManager;

use crate::exit_error::ExitError;

pub async fn handle(
    mgr: &InstanceManager,
    cwd: &Path,
    branch: Option<&str>,
    session: Option<&str>,
    cancel: &CancellationToken,
) -> Result<(), ExitError> {
    let target = mgr.attach(cwd, branch, session, cancel).await?;
    println!("detached from {}/{}", target.branch, target.session);
    Ok(())
}
