//! Shared runtime types and errors.

use std::path::PathBuf;

use crate::flags::FlagMap;

/// Which container CLI drives this runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Docker,
    Podman,
    Apple,
}

impl RuntimeKind {
    /// The program invoked on the host.
    pub fn program(&self) -> &'static str {
        match self {
            RuntimeKind::Docker => "docker",
            RuntimeKind::Podman => "podman",
            RuntimeKind::Apple => "container",
        }
    }

    /// Label key carrying this runtime's startup flags.
    pub fn flags_label(&self) -> String {
        format!("io.headjack.{}.flags", self.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeKind::Docker => "docker",
            RuntimeKind::Podman => "podman",
            RuntimeKind::Apple => "apple",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "docker" => Some(RuntimeKind::Docker),
            "podman" => Some(RuntimeKind::Podman),
            "apple" => Some(RuntimeKind::Apple),
            _ => None,
        }
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Label key whose value becomes the container's PID 1.
pub const INIT_LABEL: &str = "io.headjack.init";

/// Fallback PID 1 keeping the container alive for exec sessions.
pub const DEFAULT_INIT: &str = "sleep infinity";

/// A bind mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
    pub read_only: bool,
}

impl Mount {
    pub fn rw(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self { host: host.into(), container: container.into(), read_only: false }
    }

    pub(crate) fn render(&self) -> String {
        let mut spec = format!("{}:{}", self.host.display(), self.container);
        if self.read_only {
            spec.push_str(":ro");
        }
        spec
    }
}

/// Everything needed to start a container.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub name: String,
    /// Image reference; ignored by the devcontainer decorator.
    pub image: String,
    pub mounts: Vec<Mount>,
    pub env: Vec<(String, String)>,
    /// Extra startup flags (user config layer).
    pub flags: FlagMap,
    /// Devcontainer workspace folder (the worktree).
    pub workspace_folder: Option<PathBuf>,
}

/// One exec into a running container.
#[derive(Debug, Clone, Default)]
pub struct ExecConfig {
    pub cmd: Vec<String>,
    pub workdir: Option<String>,
    pub user: Option<String>,
    pub env: Vec<(String, String)>,
    /// Stream stdio through the caller's terminal.
    pub interactive: bool,
}

/// Coarse container state as the runtime reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Stopped,
    Unknown,
}

impl ContainerState {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" | "up" => ContainerState::Running,
            "exited" | "stopped" | "created" | "paused" | "dead" => ContainerState::Stopped,
            _ => ContainerState::Unknown,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }
}

/// What a runtime reports about a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub state: ContainerState,
    pub remote_user: Option<String>,
    pub remote_workspace: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("container {0} is not running")]
    NotRunning(String),
    #[error("failed to create container: {0}")]
    CreateFailed(String),
    #[error("registry refused access: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("{program} {command} failed: {stderr}")]
    CommandFailed { program: String, command: String, stderr: String },
    #[error("invalid flags: {0}")]
    Flags(#[from] crate::flags::FlagError),
    #[error(transparent)]
    Exec(#[from] hjk_exec::ExecError),
    #[error("decode error: {0}")]
    Decode(String),
}
