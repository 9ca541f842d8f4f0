//! Production executor over `tokio::process` / `std::process`.

use async_trait::async_trait;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;

use crate::executor::{ExecError, ExecOutput, ExecRequest, Executor, Sink};

/// Spawns real processes. Children are killed when the in-flight future is
/// dropped, so cancellation (Ctrl-C, deadlines) never leaks a child.
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        Self
    }
}

fn stdio_for(sink: Sink) -> Stdio {
    match sink {
        Sink::Capture => Stdio::piped(),
        Sink::Inherit => Stdio::inherit(),
        Sink::Null => Stdio::null(),
    }
}

#[async_trait]
impl Executor for SystemExecutor {
    async fn run(&self, req: ExecRequest) -> Result<ExecOutput, ExecError> {
        let mut cmd = tokio::process::Command::new(&req.program);
        cmd.args(&req.args)
            .stdin(if req.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(stdio_for(req.stdout))
            .stderr(stdio_for(req.stderr))
            .kill_on_drop(true);
        if let Some(dir) = &req.dir {
            cmd.current_dir(dir);
        }
        for (k, v) in &req.env {
            cmd.env(k, v);
        }
        for k in &req.env_remove {
            cmd.env_remove(k);
        }

        tracing::debug!(program = %req.program, args = ?req.args, "exec");

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExecError::NotFound(req.program.clone())
            } else {
                ExecError::Spawn { program: req.program.clone(), source: e }
            }
        })?;

        if let (Some(bytes), Some(mut stdin)) = (req.stdin.as_deref(), child.stdin.take()) {
            stdin.write_all(bytes).await?;
            drop(stdin);
        }

        let cancel = req.cancel.clone();
        let wait = child.wait_with_output();
        tokio::select! {
            output = wait => {
                let output = output?;
                Ok(ExecOutput {
                    stdout: output.stdout,
                    stderr: output.stderr,
                    code: output.status.code().unwrap_or(-1),
                })
            }
            _ = cancel.cancelled() => {
                // Dropping the wait future drops the child, and
                // kill_on_drop reaps it.
                Err(ExecError::Cancelled)
            }
        }
    }

    fn look_path(&self, name: &str) -> Result<PathBuf, ExecError> {
        if name.contains('/') {
            let p = PathBuf::from(name);
            if p.is_file() {
                return Ok(p);
            }
            return Err(ExecError::NotFound(name.to_string()));
        }
        let path = std::env::var_os("PATH").unwrap_or_default();
        for dir in std::env::split_paths(&path) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(ExecError::NotFound(name.to_string()))
    }

    fn run_interactive(&self, program: &str, args: &[String]) -> Result<i32, ExecError> {
        if !std::io::stdin().is_terminal() {
            return Err(ExecError::NotATerminal);
        }
        let status = std::process::Command::new(program).args(args).status().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExecError::NotFound(program.to_string())
            } else {
                ExecError::Spawn { program: program.to_string(), source: e }
            }
        })?;
        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
