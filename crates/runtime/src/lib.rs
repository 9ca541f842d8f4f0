// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hjk-runtime: container runtimes behind one contract.
//!
//! Docker, Podman, and Apple's `container` are driven through their CLIs;
//! the devcontainer decorator wraps Docker or Podman behind the reference
//! `devcontainer` tool. Startup flags merge from image labels and user
//! config through the flag algebra in [`flags`].

mod cli;
mod devcontainer;
pub mod flags;
mod types;

pub use cli::Cli;
pub use devcontainer::Devcontainer;
pub use flags::{FlagMap, FlagValue};
pub use types::{
    ContainerInfo, ContainerState, ExecConfig, Mount, RunConfig, RuntimeError, RuntimeKind,
};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use hjk_exec::Executor;

/// A concrete container runtime. Dispatch is a tagged sum: three CLI
/// backends plus the devcontainer decorator owning an inner backend.
#[derive(Debug)]
pub enum Runtime {
    Docker(Cli),
    Podman(Cli),
    Apple(Cli),
    Devcontainer(Devcontainer),
}

impl Runtime {
    /// Vanilla (non-devcontainer) runtime of the given kind.
    pub fn vanilla(kind: RuntimeKind, exec: Arc<dyn Executor>) -> Self {
        match kind {
            RuntimeKind::Docker => Runtime::Docker(Cli::new(kind, exec)),
            RuntimeKind::Podman => Runtime::Podman(Cli::new(kind, exec)),
            RuntimeKind::Apple => Runtime::Apple(Cli::new(kind, exec)),
        }
    }

    /// Devcontainer decorator over the given kind. Apple is refused: the
    /// devcontainer tool only drives docker-compatible CLIs.
    pub fn devcontainer(kind: RuntimeKind, exec: Arc<dyn Executor>) -> Result<Self, RuntimeError> {
        match kind {
            RuntimeKind::Docker | RuntimeKind::Podman => {
                Ok(Runtime::Devcontainer(Devcontainer::new(Cli::new(kind, exec))))
            }
            RuntimeKind::Apple => {
                Err(RuntimeError::Unsupported("devcontainer + apple runtime".into()))
            }
        }
    }

    fn cli(&self) -> &Cli {
        match self {
            Runtime::Docker(c) | Runtime::Podman(c) | Runtime::Apple(c) => c,
            Runtime::Devcontainer(d) => d.inner(),
        }
    }

    pub async fn run(
        &self,
        cfg: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<ContainerInfo, RuntimeError> {
        match self {
            Runtime::Devcontainer(d) => d.run(cfg, cancel).await,
            _ => self.cli().run(cfg, cancel).await,
        }
    }

    pub async fn exec(
        &self,
        id: &str,
        cfg: &ExecConfig,
        cancel: &CancellationToken,
    ) -> Result<hjk_exec::ExecOutput, RuntimeError> {
        match self {
            Runtime::Devcontainer(d) => d.exec(id, cfg, cancel).await,
            _ => self.cli().exec(id, cfg, cancel).await,
        }
    }

    pub async fn stop(&self, id: &str, cancel: &CancellationToken) -> Result<(), RuntimeError> {
        self.cli().stop(id, cancel).await
    }

    pub async fn start(&self, id: &str, cancel: &CancellationToken) -> Result<(), RuntimeError> {
        self.cli().start(id, cancel).await
    }

    pub async fn remove(&self, id: &str, cancel: &CancellationToken) -> Result<(), RuntimeError> {
        self.cli().remove(id, cancel).await
    }

    pub async fn get(
        &self,
        id_or_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ContainerInfo, RuntimeError> {
        self.cli().get(id_or_name, cancel).await
    }

    pub async fn list(
        &self,
        name_prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContainerInfo>, RuntimeError> {
        self.cli().list(name_prefix, cancel).await
    }

    pub async fn build(
        &self,
        tag: &str,
        dockerfile: &std::path::Path,
        context: &std::path::Path,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        self.cli().build(tag, dockerfile, context, cancel).await
    }

    /// The argv tokens a caller prepends to drop into the container:
    /// `<tokens> <container-id> <command...>`.
    pub fn exec_command(&self) -> Vec<String> {
        match self {
            Runtime::Devcontainer(d) => d.exec_command(),
            _ => self.cli().exec_command(),
        }
    }

    pub fn kind(&self) -> RuntimeKind {
        self.cli().kind()
    }

    pub fn is_devcontainer(&self) -> bool {
        matches!(self, Runtime::Devcontainer(_))
    }
}
