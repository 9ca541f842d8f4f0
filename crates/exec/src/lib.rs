// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! hjk-exec: the single boundary for external processes.
//!
//! Everything headjack shells out to (git, the container runtimes, tmux,
//! zellij, devcontainer) goes through the [`Executor`] trait so adapters
//! stay mockable and error semantics stay uniform.

mod executor;
mod system;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use executor::{ExecError, ExecOutput, ExecRequest, Executor, Sink};
pub use system::SystemExecutor;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecCall, FakeExecutor};
