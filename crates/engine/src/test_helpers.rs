//! Shared fixtures for engine tests: a manager wired to a scripted
//! executor and an in-memory secret store, plus canned CLI scripts for
//! the usual git/docker/tmux conversations.

use std::path::Path;
use std::sync::Arc;

use hjk_creds::MemorySecretStore;
use hjk_exec::FakeExecutor;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::manager::InstanceManager;
use crate::paths::StatePaths;
use crate::settings::Settings;

pub(crate) const ROOT_SHA: &str = "a1b2c3d4e5f6071829a0b1c2d3e4f50617283940";

pub(crate) struct Fixture {
    pub tmp: TempDir,
    pub fake: FakeExecutor,
    pub mgr: InstanceManager,
}

impl Fixture {
    pub fn repo_dir(&self) -> std::path::PathBuf {
        self.tmp.path().join("myapp")
    }

    /// `myapp-a1b2c3d` for the canned root commit.
    pub fn repo_id(&self) -> &'static str {
        "myapp-a1b2c3d"
    }
}

pub(crate) fn cancel() -> CancellationToken {
    CancellationToken::new()
}

pub(crate) fn fixture() -> Fixture {
    fixture_with(Settings::default())
}

pub(crate) fn fixture_with(settings: Settings) -> Fixture {
    let tmp = TempDir::new().unwrap();
    let fake = FakeExecutor::new();
    let paths = StatePaths::under(tmp.path().join("state"), &settings);
    let mgr = InstanceManager::new(
        settings,
        paths,
        Arc::new(fake.clone()),
        Box::new(MemorySecretStore::default()),
    );
    Fixture { tmp, fake, mgr }
}

/// `git rev-parse` + root-commit lookup for a repo rooted at `root`.
pub(crate) fn script_repo(fake: &FakeExecutor, root: &Path) {
    fake.on_ok("git", ["rev-parse", "--show-toplevel"], &format!("{}\n", root.display()));
    fake.on_ok("git", ["rev-list", "--max-parents=0", "HEAD"], &format!("{}\n", ROOT_SHA));
}

/// Branch missing locally and remotely; `worktree add` succeeds.
pub(crate) fn script_worktree_create(fake: &FakeExecutor) {
    fake.on_fail("git", ["show-ref"], 1, "");
    fake.on_ok("git", ["branch", "-r", "--list"], "");
    fake.on_ok("git", ["worktree", "add"], "");
    fake.on_ok("git", ["worktree", "list", "--porcelain"], "");
    fake.on_ok("git", ["worktree", "remove"], "");
}

/// Unlabeled image, `docker run` hands back `container_id`.
pub(crate) fn script_container_run(fake: &FakeExecutor, container_id: &str) {
    fake.on_ok("docker", ["image", "inspect"], "null");
    fake.on_ok("docker", ["run"], &format!("{}\n", container_id));
}

/// `docker inspect` reports the container in the given state.
pub(crate) fn script_container_state(fake: &FakeExecutor, container_id: &str, state: &str) {
    fake.on_ok(
        "docker",
        ["inspect"],
        &format!("{}\t/hjk-container\t{}\n", container_id, state),
    );
}

/// tmux accepts creates/pipes/kills; no sessions listed yet.
pub(crate) fn script_tmux(fake: &FakeExecutor) {
    fake.on_ok("tmux", ["new-session"], "");
    fake.on_ok("tmux", ["pipe-pane"], "");
    fake.on_ok("tmux", ["kill-session"], "");
    fake.on_fail("tmux", ["list-sessions"], 1, "no server running on /tmp/tmux-1000/default");
}

/// Overwrite the list-sessions script with live session names.
pub(crate) fn script_tmux_sessions(fake: &FakeExecutor, names: &[&str]) {
    let mut stdout = names.join("\n");
    if !names.is_empty() {
        stdout.push('\n');
    }
    fake.on_ok("tmux", ["list-sessions"], &stdout);
}
