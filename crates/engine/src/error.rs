//! Engine error taxonomy. Lower layers convert in; the CLI renders one
//! error line plus, when one exists, a one-line hint.

use hjk_creds::{CaptureError, CredError};
use hjk_git::GitError;
use hjk_mux::MuxError;
use hjk_runtime::flags::FlagError;
use hjk_runtime::RuntimeError;
use hjk_storage::CatalogError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no instance for branch '{branch}'")]
    NoInstance { branch: String },
    #[error("no session found{}", fmt_scope(.scope))]
    NoSession { scope: Option<String> },
    #[error("session name '{0}' is already in use")]
    SessionNameTaken(String),
    #[error("{0}")]
    PreconditionFailed(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Mux(#[from] MuxError),
    #[error(transparent)]
    Cred(#[from] CredError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("invalid runtime flags in config: {0}")]
    Flags(#[from] FlagError),
    #[error(transparent)]
    Exec(#[from] hjk_exec::ExecError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_scope(scope: &Option<String>) -> String {
    match scope {
        Some(scope) => format!(" for {}", scope),
        None => String::new(),
    }
}

impl EngineError {
    /// One-line suggestion shown under the error, when one helps.
    pub fn hint(&self) -> Option<String> {
        match self {
            EngineError::NoInstance { branch } => {
                Some(format!("run `hjk run {}` to create one", branch))
            }
            EngineError::NoSession { .. } => {
                Some("run `hjk run <branch>` or `hjk exec <branch>` to open one".to_string())
            }
            EngineError::Mux(MuxError::DetachedModeNotSupported(_)) => {
                Some("set `mux = \"tmux\"` in the headjack config".to_string())
            }
            EngineError::Runtime(RuntimeError::Unsupported(_)) => {
                Some("use `--image` or switch `runtime` in the headjack config".to_string())
            }
            _ => None,
        }
    }

    /// True when the user interrupted the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            EngineError::Catalog(CatalogError::Cancelled)
                | EngineError::Exec(hjk_exec::ExecError::Cancelled)
                | EngineError::Git(GitError::Exec(hjk_exec::ExecError::Cancelled))
                | EngineError::Runtime(RuntimeError::Exec(hjk_exec::ExecError::Cancelled))
                | EngineError::Mux(MuxError::Exec(hjk_exec::ExecError::Cancelled))
        )
    }
}
