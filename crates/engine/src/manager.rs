//! Instance lifecycle: ensure, stop, recreate, remove, list.
//!
//! Provisioning is transactional under partial failure: the catalog row
//! goes in first (claiming the `(repo_id, branch)` slot), then the
//! worktree, then the container; any failure unwinds in reverse and
//! surfaces the first error. Unwind steps are best-effort and logged.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use hjk_core::{sanitize_branch, Instance, InstanceStatus};
use hjk_creds::{CredentialStore, KeyValueSecretStore};
use hjk_exec::Executor;
use hjk_git::Repo;
use hjk_mux::Multiplexer;
use hjk_runtime::{flags, ContainerState, Mount, RunConfig, Runtime, RuntimeError};
use hjk_storage::{Catalog, LogLayout};

use crate::error::EngineError;
use crate::paths::StatePaths;
use crate::settings::Settings;

/// Container name for an instance.
pub(crate) fn container_name(instance: &Instance) -> String {
    format!("hjk-{}", instance.id)
}

/// One row of `hjk ps`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InstanceView {
    #[serde(flatten)]
    pub instance: Instance,
    /// Live state as the runtime reports it (None when the container is
    /// gone or was never created).
    pub container_state: Option<String>,
}

pub struct InstanceManager {
    pub(crate) exec: Arc<dyn Executor>,
    pub(crate) catalog: Catalog,
    pub(crate) mux: Multiplexer,
    pub(crate) creds: CredentialStore,
    pub(crate) logs: LogLayout,
    pub(crate) settings: Settings,
    pub(crate) paths: StatePaths,
}

impl InstanceManager {
    pub fn new(
        settings: Settings,
        paths: StatePaths,
        exec: Arc<dyn Executor>,
        secrets: Box<dyn KeyValueSecretStore>,
    ) -> Self {
        Self {
            catalog: Catalog::new(&paths.catalog),
            mux: Multiplexer::new(settings.mux, Arc::clone(&exec)),
            creds: CredentialStore::new(secrets),
            logs: LogLayout::new(&paths.logs_root),
            exec,
            settings,
            paths,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn creds(&self) -> &CredentialStore {
        &self.creds
    }

    pub fn logs(&self) -> &LogLayout {
        &self.logs
    }

    pub(crate) async fn open_repo(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Repo, EngineError> {
        Ok(Repo::open(Arc::clone(&self.exec), dir, cancel).await?)
    }

    /// Look up the instance for a branch of the repository at `repo_dir`.
    pub async fn instance(
        &self,
        repo_dir: &Path,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<Instance, EngineError> {
        self.entry_for_branch(repo_dir, branch, cancel).await
    }

    pub(crate) async fn entry_for_branch(
        &self,
        repo_dir: &Path,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<Instance, EngineError> {
        let repo = self.open_repo(repo_dir, cancel).await?;
        match self.catalog.get_by_repo_branch(repo.id(), branch, cancel).await {
            Ok(entry) => Ok(entry),
            Err(hjk_storage::CatalogError::NotFound(_)) => {
                Err(EngineError::NoInstance { branch: branch.to_string() })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pick the runtime for a worktree. An explicit image override wins
    /// and always uses the vanilla runtime; a
    /// `.devcontainer/devcontainer.json` in the worktree selects the
    /// decorator; everything else runs the configured default image.
    pub(crate) fn select_runtime(
        &self,
        worktree: &Path,
        image_override: Option<&str>,
    ) -> Result<(Runtime, String), EngineError> {
        if let Some(image) = image_override {
            let runtime = Runtime::vanilla(self.settings.runtime, Arc::clone(&self.exec));
            return Ok((runtime, image.to_string()));
        }
        if worktree.join(".devcontainer").join("devcontainer.json").is_file() {
            let runtime = Runtime::devcontainer(self.settings.runtime, Arc::clone(&self.exec))?;
            return Ok((runtime, String::new()));
        }
        let runtime = Runtime::vanilla(self.settings.runtime, Arc::clone(&self.exec));
        Ok((runtime, self.settings.base_image.clone()))
    }

    /// Runtime for operating on an already-provisioned instance.
    pub(crate) fn runtime_for(&self, entry: &Instance) -> Result<Runtime, EngineError> {
        self.select_runtime(&entry.worktree, None).map(|(runtime, _)| runtime)
    }

    /// The worktree path for a branch: `<worktrees>/<repo_id>/<sanitized>`.
    fn worktree_path(&self, repo_id: &str, branch: &str) -> PathBuf {
        self.paths.worktrees_root.join(repo_id).join(sanitize_branch(branch))
    }

    /// Return the instance for `(repo, branch)`, provisioning worktree and
    /// container on first use and restarting a stopped container.
    /// Idempotent: a second call returns the same instance untouched.
    pub async fn ensure_instance(
        &self,
        repo_dir: &Path,
        branch: &str,
        image_override: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Instance, EngineError> {
        let repo = self.open_repo(repo_dir, cancel).await?;

        match self.catalog.get_by_repo_branch(repo.id(), branch, cancel).await {
            Ok(entry) => self.resume_if_stopped(entry, cancel).await,
            Err(hjk_storage::CatalogError::NotFound(_)) => {
                self.provision(&repo, branch, image_override, cancel).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Start the container of an existing entry when it isn't running.
    pub(crate) async fn resume_if_stopped(
        &self,
        mut entry: Instance,
        cancel: &CancellationToken,
    ) -> Result<Instance, EngineError> {
        if entry.container_id.is_empty() {
            return Err(EngineError::PreconditionFailed(format!(
                "instance for '{}' has no container; run `hjk recreate {}`",
                entry.branch, entry.branch
            )));
        }
        let runtime = self.runtime_for(&entry)?;
        let running = match runtime.get(&entry.container_id, cancel).await {
            Ok(info) => info.state.is_running(),
            Err(RuntimeError::NotFound(_)) => {
                return Err(EngineError::PreconditionFailed(format!(
                    "container for '{}' is gone; run `hjk recreate {}`",
                    entry.branch, entry.branch
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if !running {
            runtime.start(&entry.container_id, cancel).await?;
        }
        if !running || entry.status != InstanceStatus::Running {
            entry.status = InstanceStatus::Running;
            self.catalog.update(entry.clone(), cancel).await?;
        }
        Ok(entry)
    }

    async fn provision(
        &self,
        repo: &Repo,
        branch: &str,
        image_override: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Instance, EngineError> {
        let worktree = self.worktree_path(repo.id(), branch);
        let mut entry =
            Instance::new(repo.root().to_path_buf(), repo.id(), branch, worktree.clone());
        tracing::info!(branch, id = %entry.id, "provisioning instance");

        // Claim the (repo_id, branch) slot first; a concurrent run loses
        // the race here and sees our entry instead.
        match self.catalog.add(entry.clone(), cancel).await {
            Ok(()) => {}
            Err(hjk_storage::CatalogError::AlreadyExists { .. }) => {
                let existing = self.catalog.get_by_repo_branch(repo.id(), branch, cancel).await?;
                return Ok(existing);
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = repo.create_worktree(&worktree, branch, cancel).await {
            self.unwind(repo, &entry, false, false).await;
            return Err(e.into());
        }

        let selected = self.select_runtime(&worktree, image_override);
        let (runtime, image) = match selected {
            Ok(pair) => pair,
            Err(e) => {
                self.unwind(repo, &entry, true, false).await;
                return Err(e);
            }
        };

        let cfg = match self.run_config(&entry, image) {
            Ok(cfg) => cfg,
            Err(e) => {
                self.unwind(repo, &entry, true, false).await;
                return Err(e);
            }
        };
        let info = match runtime.run(&cfg, cancel).await {
            Ok(info) => info,
            Err(e) => {
                self.unwind(repo, &entry, true, false).await;
                return Err(e.into());
            }
        };

        entry.container_id = info.id;
        entry.remote_user = info.remote_user;
        entry.remote_workdir = info.remote_workspace;
        entry.status = InstanceStatus::Running;
        if let Err(e) = self.catalog.update(entry.clone(), cancel).await {
            self.unwind(repo, &entry, true, true).await;
            return Err(e.into());
        }
        Ok(entry)
    }

    fn run_config(&self, entry: &Instance, image: String) -> Result<RunConfig, EngineError> {
        Ok(RunConfig {
            name: container_name(entry),
            image,
            mounts: vec![Mount::rw(&entry.worktree, "/workspace")],
            env: vec![("HEADJACK_INSTANCE".to_string(), entry.id.to_string())],
            flags: flags::from_config(&self.settings.runtime_flags)?,
            workspace_folder: Some(entry.worktree.clone()),
        })
    }

    /// Reverse-order, best-effort cleanup of a failed provision. Errors
    /// here are logged, never surfaced over the original failure.
    async fn unwind(&self, repo: &Repo, entry: &Instance, worktree: bool, container: bool) {
        let cancel = CancellationToken::new();
        if container && !entry.container_id.is_empty() {
            if let Ok(runtime) = self.runtime_for(entry) {
                let _ = runtime.stop(&entry.container_id, &cancel).await;
                if let Err(e) = runtime.remove(&entry.container_id, &cancel).await {
                    tracing::warn!(error = %e, "unwind: failed to remove container");
                }
            }
        }
        if worktree {
            if let Err(e) = repo.remove_worktree(&entry.worktree, &cancel).await {
                tracing::warn!(error = %e, "unwind: failed to remove worktree");
            }
            remove_dir_best_effort(&entry.worktree);
        }
        if let Err(e) = self.catalog.remove(&entry.id, &cancel).await {
            tracing::warn!(error = %e, "unwind: failed to remove catalog row");
        }
    }

    /// Stop the container and drop all sessions; the worktree and the
    /// catalog row stay.
    pub async fn stop(
        &self,
        repo_dir: &Path,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<Instance, EngineError> {
        let mut entry = self.entry_for_branch(repo_dir, branch, cancel).await?;
        self.kill_all_sessions(&entry, cancel).await;
        if !entry.container_id.is_empty() {
            let runtime = self.runtime_for(&entry)?;
            match runtime.stop(&entry.container_id, cancel).await {
                Ok(()) | Err(RuntimeError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        entry.sessions.clear();
        entry.status = InstanceStatus::Stopped;
        self.catalog.update(entry.clone(), cancel).await?;
        Ok(entry)
    }

    /// Replace the container, keeping the worktree. Sessions are dropped.
    pub async fn recreate(
        &self,
        repo_dir: &Path,
        branch: &str,
        image_override: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Instance, EngineError> {
        let mut entry = self.entry_for_branch(repo_dir, branch, cancel).await?;
        self.kill_all_sessions(&entry, cancel).await;

        if !entry.container_id.is_empty() {
            let runtime = self.runtime_for(&entry)?;
            let _ = runtime.stop(&entry.container_id, cancel).await;
            match runtime.remove(&entry.container_id, cancel).await {
                Ok(()) | Err(RuntimeError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let (runtime, image) = self.select_runtime(&entry.worktree, image_override)?;
        let cfg = self.run_config(&entry, image)?;
        let info = runtime.run(&cfg, cancel).await?;

        entry.container_id = info.id;
        entry.remote_user = info.remote_user;
        entry.remote_workdir = info.remote_workspace;
        entry.sessions.clear();
        entry.status = InstanceStatus::Running;
        self.catalog.update(entry.clone(), cancel).await?;
        Ok(entry)
    }

    /// Tear the instance down completely: sessions, container, worktree,
    /// logs, catalog row.
    pub async fn remove(
        &self,
        repo_dir: &Path,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let entry = self.entry_for_branch(repo_dir, branch, cancel).await?;
        self.kill_all_sessions(&entry, cancel).await;

        if !entry.container_id.is_empty() {
            let runtime = self.runtime_for(&entry)?;
            let _ = runtime.stop(&entry.container_id, cancel).await;
            match runtime.remove(&entry.container_id, cancel).await {
                Ok(()) | Err(RuntimeError::NotFound(_)) => {}
                Err(e) => tracing::warn!(error = %e, "failed to remove container"),
            }
        }

        let repo = self.open_repo(&entry.repo, cancel).await?;
        match repo.remove_worktree(&entry.worktree, cancel).await {
            Ok(()) | Err(hjk_git::GitError::WorktreeNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        remove_dir_best_effort(&entry.worktree);

        if let Err(e) = self.logs.remove_instance_logs(&entry.id) {
            tracing::warn!(error = %e, "failed to remove instance logs");
        }
        self.catalog.remove(&entry.id, cancel).await?;
        Ok(())
    }

    /// Read the catalog, reconciling each entry against the live mux
    /// sessions and container state. Scoped to one repo unless `repo_dir`
    /// is None.
    pub async fn list(
        &self,
        repo_dir: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<Vec<InstanceView>, EngineError> {
        let filter = match repo_dir {
            Some(dir) => {
                let repo = self.open_repo(dir, cancel).await?;
                hjk_storage::ListFilter { repo_id: Some(repo.id().to_string()), status: None }
            }
            None => hjk_storage::ListFilter::default(),
        };
        let entries = self.catalog.list(filter, cancel).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let live = self.mux.list_sessions(cancel).await?;

        let mut views = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = self.reconcile(entry, &live, cancel).await?;
            let state = self.container_state(&entry, cancel).await?;
            views.push(InstanceView {
                container_state: state.map(|s| format!("{:?}", s).to_lowercase()),
                instance: entry,
            });
        }
        Ok(views)
    }

    /// Drop catalog sessions whose mux session is gone, and reflect a
    /// stopped container in the status.
    pub(crate) async fn reconcile(
        &self,
        mut entry: Instance,
        live_sessions: &[String],
        cancel: &CancellationToken,
    ) -> Result<Instance, EngineError> {
        let before = entry.sessions.len();
        entry.sessions.retain(|s| live_sessions.iter().any(|l| l == &s.mux_session));
        let mut dirty = entry.sessions.len() != before;

        if entry.status == InstanceStatus::Running {
            let state = self.container_state(&entry, cancel).await?;
            if !matches!(state, Some(ContainerState::Running)) {
                entry.status = InstanceStatus::Stopped;
                dirty = true;
            }
        }
        if dirty {
            self.catalog.update(entry.clone(), cancel).await?;
        }
        Ok(entry)
    }

    async fn container_state(
        &self,
        entry: &Instance,
        cancel: &CancellationToken,
    ) -> Result<Option<ContainerState>, EngineError> {
        if entry.container_id.is_empty() {
            return Ok(None);
        }
        let runtime = self.runtime_for(entry)?;
        match runtime.get(&entry.container_id, cancel).await {
            Ok(info) => Ok(Some(info.state)),
            Err(RuntimeError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Kill every mux session of an instance, best-effort.
    pub(crate) async fn kill_all_sessions(&self, entry: &Instance, cancel: &CancellationToken) {
        for session in &entry.sessions {
            match self.mux.kill_session(&session.mux_session, cancel).await {
                Ok(()) | Err(hjk_mux::MuxError::SessionNotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(session = %session.mux_session, error = %e, "failed to kill session")
                }
            }
        }
    }
}

fn remove_dir_best_effort(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_dir_all(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove directory");
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
