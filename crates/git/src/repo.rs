//! Repository handle: open, stable identity, branch checks, worktrees.
//!
//! The identity is `<basename>-<first7-of-root-commit>`: the root commit
//! survives clones, forks, and renames, so every checkout of one project
//! maps to one identity.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use hjk_exec::{ExecError, ExecOutput, ExecRequest, Executor};

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("{0} is not inside a git repository")]
    NotRepository(PathBuf),
    #[error("worktree already exists: {0}")]
    WorktreeExists(String),
    #[error("{0} is not a tracked worktree")]
    WorktreeNotFound(PathBuf),
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One record from `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub bare: bool,
}

/// Handle to an opened repository.
#[derive(Clone)]
pub struct Repo {
    root: PathBuf,
    id: String,
    exec: Arc<dyn Executor>,
}

impl std::fmt::Debug for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repo")
            .field("root", &self.root)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Repo {
    /// Resolve `dir` to its repository root and compute the identity.
    pub async fn open(
        exec: Arc<dyn Executor>,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Self, GitError> {
        let out = run_git(&exec, dir, ["rev-parse", "--show-toplevel"], cancel).await?;
        if !out.success() {
            return Err(GitError::NotRepository(dir.to_path_buf()));
        }
        let root = PathBuf::from(out.stdout_str().trim());

        let out = run_git(&exec, &root, ["rev-list", "--max-parents=0", "HEAD"], cancel).await?;
        if !out.success() {
            return Err(GitError::CommandFailed {
                command: "rev-list --max-parents=0 HEAD".into(),
                stderr: out.stderr_str(),
            });
        }
        // A history merged from multiple roots lists several commits; the
        // first line is the stable one git always reports first.
        let sha = out
            .stdout_lines()
            .into_iter()
            .next()
            .unwrap_or_default();
        if sha.len() < 7 {
            return Err(GitError::CommandFailed {
                command: "rev-list --max-parents=0 HEAD".into(),
                stderr: "repository has no commits".into(),
            });
        }
        let basename = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repo".to_string());
        let id = format!("{}-{}", basename, &sha[..7]);

        Ok(Self { root, id, exec })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable repository identity: `<basename>-<first7-of-root-commit>`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when `branch` names a local ref or any remote-tracking ref.
    pub async fn branch_exists(
        &self,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, GitError> {
        let local = self
            .git(["show-ref", "--verify", "--quiet", &format!("refs/heads/{}", branch)], cancel)
            .await?;
        if local.success() {
            return Ok(true);
        }
        let remote = self
            .git(["branch", "-r", "--list", &format!("*/{}", branch)], cancel)
            .await?;
        Ok(remote.success() && !remote.stdout_str().trim().is_empty())
    }

    /// Check out `branch` at `path`, creating the branch from HEAD if it
    /// doesn't exist yet.
    pub async fn create_worktree(
        &self,
        path: &Path,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<(), GitError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let path_str = path.display().to_string();
        let exists = self.branch_exists(branch, cancel).await?;
        let out = if exists {
            self.git(["worktree", "add", &path_str, branch], cancel).await?
        } else {
            self.git(["worktree", "add", "-b", branch, &path_str], cancel).await?
        };
        if !out.success() {
            let stderr = out.stderr_str();
            if stderr.contains("already exists")
                || stderr.contains("already checked out")
                || stderr.contains("already used by worktree")
            {
                return Err(GitError::WorktreeExists(stderr));
            }
            return Err(GitError::CommandFailed { command: "worktree add".into(), stderr });
        }
        Ok(())
    }

    /// Remove the worktree at `path`. The branch itself is left alone.
    pub async fn remove_worktree(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), GitError> {
        let known = self.list_worktrees(cancel).await?;
        if !known.iter().any(|w| w.path == path) {
            return Err(GitError::WorktreeNotFound(path.to_path_buf()));
        }
        let path_str = path.display().to_string();
        let out = self.git(["worktree", "remove", "--force", &path_str], cancel).await?;
        if !out.success() {
            return Err(GitError::CommandFailed {
                command: "worktree remove".into(),
                stderr: out.stderr_str(),
            });
        }
        Ok(())
    }

    /// Parse `git worktree list --porcelain`.
    pub async fn list_worktrees(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorktreeEntry>, GitError> {
        let out = self.git(["worktree", "list", "--porcelain"], cancel).await?;
        if !out.success() {
            return Err(GitError::CommandFailed {
                command: "worktree list".into(),
                stderr: out.stderr_str(),
            });
        }
        Ok(parse_porcelain(&out.stdout_str()))
    }

    /// The worktree that has `branch` checked out, if any.
    pub async fn worktree_for_branch(
        &self,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<WorktreeEntry>, GitError> {
        let full = format!("refs/heads/{}", branch);
        Ok(self
            .list_worktrees(cancel)
            .await?
            .into_iter()
            .find(|w| w.branch.as_deref() == Some(full.as_str())))
    }

    async fn git<const N: usize>(
        &self,
        args: [&str; N],
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, GitError> {
        run_git(&self.exec, &self.root, args, cancel).await
    }
}

async fn run_git<const N: usize>(
    exec: &Arc<dyn Executor>,
    dir: &Path,
    args: [&str; N],
    cancel: &CancellationToken,
) -> Result<ExecOutput, GitError> {
    let req = ExecRequest::new("git", args)
        .dir(dir)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .cancel(cancel.clone());
    Ok(exec.run(req).await?)
}

fn parse_porcelain(raw: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<WorktreeEntry> = None;
    for line in raw.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(done) = current.take() {
                entries.push(done);
            }
            current = Some(WorktreeEntry {
                path: PathBuf::from(path),
                branch: None,
                bare: false,
            });
        } else if let Some(branch) = line.strip_prefix("branch ") {
            if let Some(entry) = current.as_mut() {
                entry.branch = Some(branch.to_string());
            }
        } else if line == "bare" {
            if let Some(entry) = current.as_mut() {
                entry.bare = true;
            }
        }
    }
    if let Some(done) = current.take() {
        entries.push(done);
    }
    entries
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
