// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hjk-git: repository identity and worktree management, by shelling out
//! to the `git` tool.

mod repo;

pub use repo::{GitError, Repo, WorktreeEntry};
