use super::*;
use hjk_exec::FakeExecutor;

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

fn fake() -> (Arc<dyn Executor>, FakeExecutor) {
    let fake = FakeExecutor::new();
    (Arc::new(fake.clone()), fake)
}

const ROOT_SHA: &str = "a1b2c3d4e5f6071829a0b1c2d3e4f50617283940";

fn script_open(fake: &FakeExecutor, root: &str) {
    fake.on_ok("git", ["rev-parse", "--show-toplevel"], &format!("{root}\n"));
    fake.on_ok("git", ["rev-list", "--max-parents=0", "HEAD"], &format!("{ROOT_SHA}\n"));
}

#[tokio::test]
async fn open_computes_identity_from_basename_and_root_commit() {
    let (exec, fake) = fake();
    script_open(&fake, "/home/u/src/myapp");
    let repo = Repo::open(exec, Path::new("/home/u/src/myapp/sub"), &cancel()).await.unwrap();
    assert_eq!(repo.root(), Path::new("/home/u/src/myapp"));
    assert_eq!(repo.id(), "myapp-a1b2c3d");
}

#[tokio::test]
async fn open_outside_a_repository_fails() {
    let (exec, fake) = fake();
    fake.on_fail("git", ["rev-parse", "--show-toplevel"], 128, "fatal: not a git repository");
    let err = Repo::open(exec, Path::new("/tmp/nowhere"), &cancel()).await.unwrap_err();
    assert!(matches!(err, GitError::NotRepository(_)));
}

#[tokio::test]
async fn open_on_empty_repository_fails() {
    let (exec, fake) = fake();
    fake.on_ok("git", ["rev-parse", "--show-toplevel"], "/src/empty\n");
    fake.on_ok("git", ["rev-list", "--max-parents=0", "HEAD"], "");
    let err = Repo::open(exec, Path::new("/src/empty"), &cancel()).await.unwrap_err();
    assert!(matches!(err, GitError::CommandFailed { .. }));
}

#[tokio::test]
async fn multi_root_history_uses_first_listed_root() {
    let (exec, fake) = fake();
    fake.on_ok("git", ["rev-parse", "--show-toplevel"], "/src/merged\n");
    fake.on_ok(
        "git",
        ["rev-list", "--max-parents=0", "HEAD"],
        "0000000111111112222222333333344444445555\nffffffff00000000111111112222222233333333\n",
    );
    let repo = Repo::open(exec, Path::new("/src/merged"), &cancel()).await.unwrap();
    assert_eq!(repo.id(), "merged-0000000");
}

#[tokio::test]
async fn branch_exists_checks_local_then_remote() {
    let (exec, fake) = fake();
    script_open(&fake, "/src/myapp");
    let repo = Repo::open(exec, Path::new("/src/myapp"), &cancel()).await.unwrap();

    fake.on_ok("git", ["show-ref", "--verify", "--quiet", "refs/heads/main"], "");
    assert!(repo.branch_exists("main", &cancel()).await.unwrap());

    fake.on_fail("git", ["show-ref", "--verify", "--quiet", "refs/heads/remote-only"], 1, "");
    fake.on_ok("git", ["branch", "-r", "--list", "*/remote-only"], "  origin/remote-only\n");
    assert!(repo.branch_exists("remote-only", &cancel()).await.unwrap());

    fake.on_fail("git", ["show-ref", "--verify", "--quiet", "refs/heads/nope"], 1, "");
    fake.on_ok("git", ["branch", "-r", "--list", "*/nope"], "");
    assert!(!repo.branch_exists("nope", &cancel()).await.unwrap());
}

#[tokio::test]
async fn create_worktree_uses_dash_b_for_new_branches() {
    let (exec, fake) = fake();
    script_open(&fake, "/src/myapp");
    let repo = Repo::open(exec, Path::new("/src/myapp"), &cancel()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let wt = dir.path().join("wt/feat-auth");

    fake.on_fail("git", ["show-ref", "--verify", "--quiet", "refs/heads/feat/auth"], 1, "");
    fake.on_ok("git", ["branch", "-r", "--list", "*/feat/auth"], "");
    fake.on_ok("git", ["worktree", "add"], "");
    repo.create_worktree(&wt, "feat/auth", &cancel()).await.unwrap();

    let adds: Vec<_> = fake
        .calls_to("git")
        .into_iter()
        .filter(|c| c.args.first().map(String::as_str) == Some("worktree"))
        .collect();
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].args[..3], ["worktree", "add", "-b"]);
    assert_eq!(adds[0].args[3], "feat/auth");
    // Parent directory was created for the worktree path
    assert!(wt.parent().unwrap().is_dir());
}

#[tokio::test]
async fn create_worktree_checks_out_existing_branch() {
    let (exec, fake) = fake();
    script_open(&fake, "/src/myapp");
    let repo = Repo::open(exec, Path::new("/src/myapp"), &cancel()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let wt = dir.path().join("main");
    fake.on_ok("git", ["show-ref", "--verify", "--quiet", "refs/heads/main"], "");
    fake.on_ok("git", ["worktree", "add"], "");
    repo.create_worktree(&wt, "main", &cancel()).await.unwrap();

    let adds: Vec<_> = fake
        .calls_to("git")
        .into_iter()
        .filter(|c| c.args.first().map(String::as_str) == Some("worktree"))
        .collect();
    assert_eq!(adds[0].args[0..2], ["worktree", "add"]);
    assert!(!adds[0].args.contains(&"-b".to_string()));
}

#[tokio::test]
async fn create_worktree_maps_checked_out_elsewhere() {
    let (exec, fake) = fake();
    script_open(&fake, "/src/myapp");
    let repo = Repo::open(exec, Path::new("/src/myapp"), &cancel()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    fake.on_ok("git", ["show-ref", "--verify", "--quiet", "refs/heads/main"], "");
    fake.on_fail(
        "git",
        ["worktree", "add"],
        128,
        "fatal: 'main' is already checked out at '/other/wt'",
    );
    let err = repo.create_worktree(&dir.path().join("x"), "main", &cancel()).await.unwrap_err();
    assert!(matches!(err, GitError::WorktreeExists(_)));
}

#[tokio::test]
async fn remove_worktree_requires_tracked_path() {
    let (exec, fake) = fake();
    script_open(&fake, "/src/myapp");
    let repo = Repo::open(exec, Path::new("/src/myapp"), &cancel()).await.unwrap();

    fake.on_ok(
        "git",
        ["worktree", "list", "--porcelain"],
        "worktree /src/myapp\nHEAD aaaa\nbranch refs/heads/main\n\n",
    );
    let err = repo.remove_worktree(Path::new("/wt/gone"), &cancel()).await.unwrap_err();
    assert!(matches!(err, GitError::WorktreeNotFound(_)));
}

#[tokio::test]
async fn remove_worktree_forces_removal_of_tracked_path() {
    let (exec, fake) = fake();
    script_open(&fake, "/src/myapp");
    let repo = Repo::open(exec, Path::new("/src/myapp"), &cancel()).await.unwrap();

    fake.on_ok(
        "git",
        ["worktree", "list", "--porcelain"],
        "worktree /src/myapp\nHEAD aaaa\nbranch refs/heads/main\n\nworktree /wt/feat\nHEAD bbbb\nbranch refs/heads/feat\n\n",
    );
    fake.on_ok("git", ["worktree", "remove"], "");
    repo.remove_worktree(Path::new("/wt/feat"), &cancel()).await.unwrap();

    let removes: Vec<_> = fake
        .calls_to("git")
        .into_iter()
        .filter(|c| c.args.get(1).map(String::as_str) == Some("remove"))
        .collect();
    assert_eq!(removes[0].args, vec!["worktree", "remove", "--force", "/wt/feat"]);
}

#[tokio::test]
async fn list_and_lookup_worktrees() {
    let (exec, fake) = fake();
    script_open(&fake, "/src/myapp");
    let repo = Repo::open(exec, Path::new("/src/myapp"), &cancel()).await.unwrap();

    fake.on_ok(
        "git",
        ["worktree", "list", "--porcelain"],
        "worktree /src/myapp\nHEAD aaaa\nbranch refs/heads/main\n\nworktree /bare/repo\nbare\n\nworktree /wt/feat-auth\nHEAD cccc\nbranch refs/heads/feat/auth\n\n",
    );

    let all = repo.list_worktrees(&cancel()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].branch.as_deref(), Some("refs/heads/main"));
    assert!(all[1].bare);
    assert_eq!(all[2].path, PathBuf::from("/wt/feat-auth"));

    let found = repo.worktree_for_branch("feat/auth", &cancel()).await.unwrap().unwrap();
    assert_eq!(found.path, PathBuf::from("/wt/feat-auth"));
    assert!(repo.worktree_for_branch("gone", &cancel()).await.unwrap().is_none());
}

#[tokio::test]
async fn git_runs_without_inherited_git_env() {
    let (exec, fake) = fake();
    script_open(&fake, "/src/myapp");
    let _repo = Repo::open(exec, Path::new("/src/myapp"), &cancel()).await.unwrap();
    // Recorded calls carry program + args; env scrubbing is part of the
    // request construction, exercised here by the system executor tests.
    assert_eq!(fake.calls_to("git").len(), 2);
}
