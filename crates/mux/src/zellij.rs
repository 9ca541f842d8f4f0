//! Zellij backend.
//!
//! Zellij cannot create a session without a controlling terminal, so
//! `create_session` reports `DetachedModeNotSupported` and the instance
//! manager surfaces the condition. Attach, list, and kill are supported.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use hjk_exec::{ExecOutput, ExecRequest, Executor};

use crate::types::{CreateSession, MuxError};

const PROGRAM: &str = "zellij";

pub struct Zellij {
    exec: Arc<dyn Executor>,
}

impl Zellij {
    pub fn new(exec: Arc<dyn Executor>) -> Self {
        Self { exec }
    }

    async fn zellij(
        &self,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, MuxError> {
        let req = ExecRequest::new(PROGRAM, args).cancel(cancel.clone());
        Ok(self.exec.run(req).await?)
    }

    pub async fn create_session(
        &self,
        _spec: &CreateSession,
        _cancel: &CancellationToken,
    ) -> Result<(), MuxError> {
        // Shell backgrounding tricks produce sessions that flap in and
        // out of `list-sessions`; refuse instead of faking it.
        Err(MuxError::DetachedModeNotSupported(PROGRAM))
    }

    pub fn attach_session(&self, name: &str) -> Result<(), MuxError> {
        let args = vec!["attach".to_string(), name.to_string()];
        let code = self.exec.run_interactive(PROGRAM, &args)?;
        if code != 0 {
            return Err(MuxError::AttachFailed {
                name: name.to_string(),
                reason: format!("zellij exited with code {}", code),
            });
        }
        Ok(())
    }

    pub async fn list_sessions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, MuxError> {
        let out = self
            .zellij(vec!["list-sessions".into(), "-s".into()], cancel)
            .await?;
        if !out.success() {
            // Zellij exits non-zero when no sessions exist.
            let stderr = out.stderr_str();
            if stderr.contains("No") || stderr.is_empty() {
                return Ok(Vec::new());
            }
            return Err(MuxError::CommandFailed {
                program: PROGRAM.into(),
                command: "list-sessions".into(),
                stderr,
            });
        }
        Ok(out.stdout_lines().into_iter().filter(|l| !l.is_empty()).collect())
    }

    pub async fn kill_session(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MuxError> {
        let out = self.zellij(vec!["kill-session".into(), name.to_string()], cancel).await?;
        if !out.success() {
            return Err(MuxError::SessionNotFound(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "zellij_tests.rs"]
mod tests;
