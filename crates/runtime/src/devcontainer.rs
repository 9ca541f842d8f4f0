//! Devcontainer decorator: implements the runtime contract by driving the
//! reference `devcontainer` CLI, which itself drives the wrapped Docker or
//! Podman backend. Lifecycle operations (stop/start/remove/get/list)
//! delegate straight to the inner runtime.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use hjk_core::sh_quote;
use hjk_exec::{ExecOutput, ExecRequest};

use crate::cli::Cli;
use crate::types::{ContainerInfo, ContainerState, ExecConfig, RunConfig, RuntimeError};

const DEVCONTAINER_PROGRAM: &str = "devcontainer";

/// Wire shape of `devcontainer up --workspace-folder ...` output.
#[derive(Debug, Deserialize)]
struct UpResult {
    outcome: String,
    #[serde(rename = "containerId")]
    container_id: Option<String>,
    #[serde(rename = "remoteUser")]
    remote_user: Option<String>,
    #[serde(rename = "remoteWorkspaceFolder")]
    remote_workspace_folder: Option<String>,
    message: Option<String>,
}

pub struct Devcontainer {
    inner: Cli,
}

impl std::fmt::Debug for Devcontainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Devcontainer").field("inner", &self.inner).finish()
    }
}

impl Devcontainer {
    pub fn new(inner: Cli) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Cli {
        &self.inner
    }

    pub async fn run(
        &self,
        cfg: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<ContainerInfo, RuntimeError> {
        let workspace = cfg.workspace_folder.as_ref().ok_or_else(|| {
            RuntimeError::CreateFailed("devcontainer run requires a workspace folder".into())
        })?;

        let docker_path = self.inner.program();
        let req = ExecRequest::new(
            DEVCONTAINER_PROGRAM,
            vec![
                "up".to_string(),
                "--workspace-folder".to_string(),
                workspace.display().to_string(),
                "--docker-path".to_string(),
                docker_path.to_string(),
            ],
        )
        .cancel(cancel.clone());
        let out = self.inner_exec().run(req).await?;
        if !out.success() {
            return Err(RuntimeError::CreateFailed(out.stderr_str()));
        }

        let up = parse_up_output(&out.stdout_str())?;
        if up.outcome != "success" {
            return Err(RuntimeError::CreateFailed(
                up.message.unwrap_or_else(|| format!("outcome {:?}", up.outcome)),
            ));
        }
        let id = up.container_id.ok_or_else(|| {
            RuntimeError::Decode("devcontainer up reported success without a containerId".into())
        })?;
        Ok(ContainerInfo {
            id,
            name: cfg.name.clone(),
            state: ContainerState::Running,
            remote_user: up.remote_user,
            remote_workspace: up.remote_workspace_folder,
        })
    }

    pub async fn exec(
        &self,
        id: &str,
        cfg: &ExecConfig,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, RuntimeError> {
        let mut args: Vec<String> = vec![
            "exec".to_string(),
            "--container-id".to_string(),
            id.to_string(),
            "--docker-path".to_string(),
            self.inner.program().to_string(),
        ];
        for (k, v) in &cfg.env {
            args.push("--remote-env".to_string());
            args.push(format!("{}={}", k, v));
        }
        args.extend(wrap_workdir(cfg.workdir.as_deref(), &cfg.cmd));

        if cfg.interactive {
            let code = self.inner_exec().run_interactive(DEVCONTAINER_PROGRAM, &args)?;
            return Ok(ExecOutput { stdout: Vec::new(), stderr: Vec::new(), code });
        }
        let req = ExecRequest::new(DEVCONTAINER_PROGRAM, args).cancel(cancel.clone());
        let out = self.inner_exec().run(req).await?;
        if !out.success() && out.stderr_str().contains("not running") {
            return Err(RuntimeError::NotRunning(id.to_string()));
        }
        Ok(out)
    }

    pub fn exec_command(&self) -> Vec<String> {
        vec![
            DEVCONTAINER_PROGRAM.to_string(),
            "exec".to_string(),
            "--docker-path".to_string(),
            self.inner.program().to_string(),
            "--container-id".to_string(),
        ]
    }

    // The decorator shares the inner backend's executor.
    fn inner_exec(&self) -> &dyn hjk_exec::Executor {
        self.inner.executor()
    }
}

/// When a workdir is requested, wrap the command so it runs after `cd`:
/// `sh -c 'cd <dir> && exec "$@"' -- <cmd...>`. The directory is
/// shell-quoted; the command tokens pass through as positional args.
fn wrap_workdir(workdir: Option<&str>, cmd: &[String]) -> Vec<String> {
    match workdir {
        None => cmd.to_vec(),
        Some(dir) => {
            let mut wrapped = vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("cd {} && exec \"$@\"", sh_quote(dir)),
                "--".to_string(),
            ];
            wrapped.extend(cmd.iter().cloned());
            wrapped
        }
    }
}

/// `devcontainer up` prints log noise before the result object; the JSON
/// is the last line that parses as one.
fn parse_up_output(stdout: &str) -> Result<UpResult, RuntimeError> {
    for line in stdout.lines().rev() {
        let line = line.trim();
        if !line.starts_with('{') {
            continue;
        }
        if let Ok(up) = serde_json::from_str::<UpResult>(line) {
            return Ok(up);
        }
    }
    Err(RuntimeError::Decode("no result JSON in devcontainer up output".into()))
}

#[cfg(test)]
#[path = "devcontainer_tests.rs"]
mod tests;
