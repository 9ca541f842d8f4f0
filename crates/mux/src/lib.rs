// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hjk-mux: terminal multiplexers behind one session contract.
//!
//! tmux supports true detached creation plus pipe-to-log; Zellij cannot
//! create a session without a TTY, so its backend reports
//! `DetachedModeNotSupported` and the caller decides policy.

mod tmux;
mod types;
mod zellij;

pub use tmux::Tmux;
pub use types::{CreateSession, MuxError, MuxKind};
pub use zellij::Zellij;

use tokio_util::sync::CancellationToken;

/// A concrete multiplexer backend.
pub enum Multiplexer {
    Tmux(Tmux),
    Zellij(Zellij),
}

impl Multiplexer {
    pub fn new(kind: MuxKind, exec: std::sync::Arc<dyn hjk_exec::Executor>) -> Self {
        match kind {
            MuxKind::Tmux => Multiplexer::Tmux(Tmux::new(exec)),
            MuxKind::Zellij => Multiplexer::Zellij(Zellij::new(exec)),
        }
    }

    pub fn kind(&self) -> MuxKind {
        match self {
            Multiplexer::Tmux(_) => MuxKind::Tmux,
            Multiplexer::Zellij(_) => MuxKind::Zellij,
        }
    }

    /// Create a detached session, optionally piping all output to a log
    /// file. Zellij returns `DetachedModeNotSupported`.
    pub async fn create_session(
        &self,
        spec: &CreateSession,
        cancel: &CancellationToken,
    ) -> Result<(), MuxError> {
        match self {
            Multiplexer::Tmux(t) => t.create_session(spec, cancel).await,
            Multiplexer::Zellij(z) => z.create_session(spec, cancel).await,
        }
    }

    /// Take over the terminal until the user detaches or the session ends.
    pub fn attach_session(&self, name: &str) -> Result<(), MuxError> {
        match self {
            Multiplexer::Tmux(t) => t.attach_session(name),
            Multiplexer::Zellij(z) => z.attach_session(name),
        }
    }

    pub async fn list_sessions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, MuxError> {
        match self {
            Multiplexer::Tmux(t) => t.list_sessions(cancel).await,
            Multiplexer::Zellij(z) => z.list_sessions(cancel).await,
        }
    }

    pub async fn kill_session(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MuxError> {
        match self {
            Multiplexer::Tmux(t) => t.kill_session(name, cancel).await,
            Multiplexer::Zellij(z) => z.kill_session(name, cancel).await,
        }
    }

    pub async fn has_session(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, MuxError> {
        Ok(self.list_sessions(cancel).await?.iter().any(|s| s == name))
    }
}
