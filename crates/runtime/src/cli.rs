//! CLI-driven runtime backend for Docker, Podman, and Apple's `container`.
//!
//! The three tools share the docker argv surface for everything headjack
//! needs; the differences (program name, `rm` vs `delete`, label support)
//! live in small per-kind tables.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use hjk_exec::{ExecOutput, ExecRequest, Executor, Sink};

use crate::flags;
use crate::types::{
    ContainerInfo, ContainerState, ExecConfig, RunConfig, RuntimeError, RuntimeKind, DEFAULT_INIT,
    INIT_LABEL,
};

/// Default deadline for registry pulls.
const PULL_DEADLINE: Duration = Duration::from_secs(30);

pub struct Cli {
    kind: RuntimeKind,
    exec: std::sync::Arc<dyn Executor>,
}

impl std::fmt::Debug for Cli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cli").field("kind", &self.kind).finish_non_exhaustive()
    }
}

impl Cli {
    pub fn new(kind: RuntimeKind, exec: std::sync::Arc<dyn Executor>) -> Self {
        Self { kind, exec }
    }

    pub fn kind(&self) -> RuntimeKind {
        self.kind
    }

    pub(crate) fn program(&self) -> &'static str {
        self.kind.program()
    }

    pub(crate) fn executor(&self) -> &dyn Executor {
        self.exec.as_ref()
    }

    fn remove_verb(&self) -> &'static str {
        match self.kind {
            RuntimeKind::Docker | RuntimeKind::Podman => "rm",
            RuntimeKind::Apple => "delete",
        }
    }

    async fn invoke(
        &self,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, RuntimeError> {
        let req = ExecRequest::new(self.program(), args).cancel(cancel.clone());
        Ok(self.exec.run(req).await?)
    }

    fn fail(&self, command: &str, out: &ExecOutput) -> RuntimeError {
        let stderr = out.stderr_str();
        if stderr.contains("unauthorized") || stderr.contains("denied") {
            return RuntimeError::Unauthorized(stderr);
        }
        RuntimeError::CommandFailed {
            program: self.program().to_string(),
            command: command.to_string(),
            stderr,
        }
    }

    /// Start a container: resolve image labels (pulling if needed), fold
    /// the flag layers, and `run -d` with the init command as PID 1.
    pub async fn run(
        &self,
        cfg: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<ContainerInfo, RuntimeError> {
        let labels = self.image_labels(&cfg.image, cancel).await?;

        let label_flags = labels
            .get(&self.kind.flags_label())
            .map(|raw| flags::from_label(raw))
            .unwrap_or_default();
        let merged = flags::merge(&label_flags, &cfg.flags);

        let init: Vec<String> = labels
            .get(INIT_LABEL)
            .map(|p| vec![p.clone()])
            .unwrap_or_else(|| {
                DEFAULT_INIT.split_whitespace().map(str::to_string).collect()
            });

        let mut args: Vec<String> =
            vec!["run".into(), "-d".into(), "--name".into(), cfg.name.clone()];
        args.extend(flags::to_args(&merged));
        for mount in &cfg.mounts {
            args.push("-v".into());
            args.push(mount.render());
        }
        for (k, v) in &cfg.env {
            args.push("-e".into());
            args.push(format!("{}={}", k, v));
        }
        args.push(cfg.image.clone());
        args.extend(init);

        let out = self.invoke(args, cancel).await?;
        if !out.success() {
            return Err(match self.fail("run", &out) {
                RuntimeError::CommandFailed { stderr, .. } => RuntimeError::CreateFailed(stderr),
                other => other,
            });
        }
        let id = out.stdout_str().trim().to_string();
        Ok(ContainerInfo {
            id,
            name: cfg.name.clone(),
            state: ContainerState::Running,
            remote_user: None,
            remote_workspace: None,
        })
    }

    pub async fn exec(
        &self,
        id: &str,
        cfg: &ExecConfig,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, RuntimeError> {
        let mut args: Vec<String> = vec!["exec".into()];
        if cfg.interactive {
            args.push("-it".into());
        }
        if let Some(workdir) = &cfg.workdir {
            args.push("-w".into());
            args.push(workdir.clone());
        }
        if let Some(user) = &cfg.user {
            args.push("-u".into());
            args.push(user.clone());
        }
        for (k, v) in &cfg.env {
            args.push("-e".into());
            args.push(format!("{}={}", k, v));
        }
        args.push(id.to_string());
        args.extend(cfg.cmd.iter().cloned());

        if cfg.interactive {
            let code = self.exec.run_interactive(self.program(), &args)?;
            return Ok(ExecOutput { stdout: Vec::new(), stderr: Vec::new(), code });
        }

        let out = self.invoke(args, cancel).await?;
        if !out.success() {
            let stderr = out.stderr_str();
            if stderr.contains("is not running") || stderr.contains("not running") {
                return Err(RuntimeError::NotRunning(id.to_string()));
            }
            if stderr.contains("No such container") || stderr.contains("no such container") {
                return Err(RuntimeError::NotFound(id.to_string()));
            }
        }
        Ok(out)
    }

    pub async fn stop(&self, id: &str, cancel: &CancellationToken) -> Result<(), RuntimeError> {
        let out = self.invoke(vec!["stop".into(), id.to_string()], cancel).await?;
        if !out.success() {
            return Err(self.map_missing(id, "stop", &out));
        }
        Ok(())
    }

    pub async fn start(&self, id: &str, cancel: &CancellationToken) -> Result<(), RuntimeError> {
        let out = self.invoke(vec!["start".into(), id.to_string()], cancel).await?;
        if !out.success() {
            return Err(self.map_missing(id, "start", &out));
        }
        Ok(())
    }

    pub async fn remove(&self, id: &str, cancel: &CancellationToken) -> Result<(), RuntimeError> {
        let out = self
            .invoke(vec![self.remove_verb().into(), "-f".into(), id.to_string()], cancel)
            .await?;
        if !out.success() {
            return Err(self.map_missing(id, self.remove_verb(), &out));
        }
        Ok(())
    }

    pub async fn get(
        &self,
        id_or_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ContainerInfo, RuntimeError> {
        let out = self
            .invoke(
                vec![
                    "inspect".into(),
                    "-f".into(),
                    "{{.Id}}\t{{.Name}}\t{{.State.Status}}".into(),
                    id_or_name.to_string(),
                ],
                cancel,
            )
            .await?;
        if !out.success() {
            return Err(RuntimeError::NotFound(id_or_name.to_string()));
        }
        let stdout = out.stdout_str();
        let line = stdout.lines().next().unwrap_or_default();
        let mut fields = line.split('\t');
        let id = fields.next().unwrap_or_default().to_string();
        let name = fields.next().unwrap_or_default().trim_start_matches('/').to_string();
        let state = ContainerState::parse(fields.next().unwrap_or_default());
        if id.is_empty() {
            return Err(RuntimeError::Decode(format!("unexpected inspect output: {line:?}")));
        }
        Ok(ContainerInfo { id, name, state, remote_user: None, remote_workspace: None })
    }

    /// Containers whose name starts with `name_prefix`.
    pub async fn list(
        &self,
        name_prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContainerInfo>, RuntimeError> {
        let out = self
            .invoke(
                vec![
                    "ps".into(),
                    "-a".into(),
                    "--filter".into(),
                    format!("name={}", name_prefix),
                    "--format".into(),
                    "{{.ID}}\t{{.Names}}\t{{.State}}".into(),
                ],
                cancel,
            )
            .await?;
        if !out.success() {
            return Err(self.fail("ps", &out));
        }
        let mut found = Vec::new();
        for line in out.stdout_str().lines() {
            let mut fields = line.split('\t');
            let id = fields.next().unwrap_or_default().to_string();
            let name = fields.next().unwrap_or_default().to_string();
            let state = ContainerState::parse(fields.next().unwrap_or_default());
            if !id.is_empty() {
                found.push(ContainerInfo {
                    id,
                    name,
                    state,
                    remote_user: None,
                    remote_workspace: None,
                });
            }
        }
        Ok(found)
    }

    pub async fn build(
        &self,
        tag: &str,
        dockerfile: &Path,
        context: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        let req = ExecRequest::new(
            self.program(),
            vec![
                "build".to_string(),
                "-t".to_string(),
                tag.to_string(),
                "-f".to_string(),
                dockerfile.display().to_string(),
                context.display().to_string(),
            ],
        )
        // Builds are long and chatty; stream progress to the user.
        .stdout(Sink::Inherit)
        .stderr(Sink::Inherit)
        .cancel(cancel.clone());
        let out = self.exec.run(req).await?;
        if !out.success() {
            return Err(RuntimeError::CommandFailed {
                program: self.program().to_string(),
                command: "build".to_string(),
                stderr: format!("exit code {}", out.code),
            });
        }
        Ok(())
    }

    pub fn exec_command(&self) -> Vec<String> {
        vec![self.program().to_string(), "exec".to_string(), "-it".to_string()]
    }

    /// Read an image's labels, pulling the image when it's missing
    /// locally. Pulls run under a 30 s deadline.
    pub(crate) async fn image_labels(
        &self,
        image: &str,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, String>, RuntimeError> {
        let inspect = |image: String, cancel: CancellationToken| {
            let args = vec![
                "image".to_string(),
                "inspect".to_string(),
                "-f".to_string(),
                "{{json .Config.Labels}}".to_string(),
                image,
            ];
            async move { self.invoke(args, &cancel).await }
        };

        let out = inspect(image.to_string(), cancel.clone()).await?;
        let out = if out.success() {
            out
        } else {
            self.pull(image, cancel).await?;
            let retry = inspect(image.to_string(), cancel.clone()).await?;
            if !retry.success() {
                return Err(self.fail("image inspect", &retry));
            }
            retry
        };

        let raw = out.stdout_str();
        let raw = raw.trim();
        if raw.is_empty() || raw == "null" {
            return Ok(HashMap::new());
        }
        serde_json::from_str(raw).map_err(|e| RuntimeError::Decode(e.to_string()))
    }

    async fn pull(&self, image: &str, cancel: &CancellationToken) -> Result<(), RuntimeError> {
        tracing::info!(image, runtime = %self.kind, "pulling image");
        let pull = self.invoke(vec!["pull".into(), image.to_string()], cancel);
        let out = match tokio::time::timeout(PULL_DEADLINE, pull).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(RuntimeError::CreateFailed(format!(
                    "pulling {} timed out after {}s",
                    image,
                    PULL_DEADLINE.as_secs()
                )))
            }
        };
        if !out.success() {
            return Err(self.fail("pull", &out));
        }
        Ok(())
    }

    fn map_missing(&self, id: &str, command: &str, out: &ExecOutput) -> RuntimeError {
        let stderr = out.stderr_str();
        if stderr.contains("No such container") || stderr.contains("no such container") {
            return RuntimeError::NotFound(id.to_string());
        }
        self.fail(command, out)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
