//! tmux backend: detached create (`new-session -d`), pipe-to-log via
//! `pipe-pane`, blocking attach, list, kill.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use hjk_core::sh_quote;
use hjk_exec::{ExecOutput, ExecRequest, Executor};

use crate::types::{CreateSession, MuxError};

const PROGRAM: &str = "tmux";

pub struct Tmux {
    exec: Arc<dyn Executor>,
}

impl Tmux {
    pub fn new(exec: Arc<dyn Executor>) -> Self {
        Self { exec }
    }

    async fn tmux(
        &self,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, MuxError> {
        let req = ExecRequest::new(PROGRAM, args).cancel(cancel.clone());
        Ok(self.exec.run(req).await?)
    }

    pub async fn create_session(
        &self,
        spec: &CreateSession,
        cancel: &CancellationToken,
    ) -> Result<(), MuxError> {
        let mut args: Vec<String> =
            vec!["new-session".into(), "-d".into(), "-s".into(), spec.name.clone()];
        if let Some(cwd) = &spec.cwd {
            args.push("-c".into());
            args.push(cwd.display().to_string());
        }
        for (k, v) in &spec.env {
            args.push("-e".into());
            args.push(format!("{}={}", k, v));
        }
        if let Some(command) = &spec.command {
            args.push(command.clone());
        }

        let out = self.tmux(args, cancel).await?;
        if !out.success() {
            let stderr = out.stderr_str();
            if stderr.contains("duplicate session") {
                return Err(MuxError::SessionExists(spec.name.clone()));
            }
            return Err(MuxError::CommandFailed {
                program: PROGRAM.into(),
                command: "new-session".into(),
                stderr,
            });
        }

        if let Some(log_path) = &spec.log_path {
            let pipe = format!("cat >> {}", sh_quote(&log_path.display().to_string()));
            let out = self
                .tmux(
                    vec![
                        "pipe-pane".into(),
                        "-t".into(),
                        spec.name.clone(),
                        "-o".into(),
                        pipe,
                    ],
                    cancel,
                )
                .await?;
            if !out.success() {
                // The session exists but won't be logged; tear it down so
                // the caller doesn't track an unloggable session.
                let _ = self.kill_session(&spec.name, cancel).await;
                return Err(MuxError::CommandFailed {
                    program: PROGRAM.into(),
                    command: "pipe-pane".into(),
                    stderr: out.stderr_str(),
                });
            }
        }
        Ok(())
    }

    pub fn attach_session(&self, name: &str) -> Result<(), MuxError> {
        let args = vec!["attach-session".to_string(), "-t".to_string(), name.to_string()];
        let code = self.exec.run_interactive(PROGRAM, &args)?;
        if code != 0 {
            return Err(MuxError::AttachFailed {
                name: name.to_string(),
                reason: format!("tmux exited with code {}", code),
            });
        }
        Ok(())
    }

    pub async fn list_sessions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, MuxError> {
        let out = self
            .tmux(
                vec!["list-sessions".into(), "-F".into(), "#{session_name}".into()],
                cancel,
            )
            .await?;
        if !out.success() {
            // No server running means no sessions.
            let stderr = out.stderr_str();
            if stderr.contains("no server running") || stderr.contains("No such file") {
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
        let out = self
            .tmux(vec!["kill-session".into(), "-t".into(), name.to_string()], cancel)
            .await?;
        if !out.success() {
            let stderr = out.stderr_str();
            if stderr.contains("can't find session") || stderr.contains("no server running") {
                return Err(MuxError::SessionNotFound(name.to_string()));
            }
            return Err(MuxError::CommandFailed {
                program: PROGRAM.into(),
                command: "kill-session".into(),
                stderr,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
