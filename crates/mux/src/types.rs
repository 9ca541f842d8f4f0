//! Shared multiplexer types and errors.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuxKind {
    Tmux,
    Zellij,
}

impl MuxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MuxKind::Tmux => "tmux",
            MuxKind::Zellij => "zellij",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tmux" => Some(MuxKind::Tmux),
            "zellij" => Some(MuxKind::Zellij),
            _ => None,
        }
    }
}

impl std::fmt::Display for MuxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything needed to create one detached session.
#[derive(Debug, Clone, Default)]
pub struct CreateSession {
    /// Namespaced session name (`hjk-<instance>-<session>`).
    pub name: String,
    /// Shell command the session runs; the user's shell when empty.
    pub command: Option<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// When set, all session output is additionally piped to this file.
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("session already exists: {0}")]
    SessionExists(String),
    #[error("failed to attach to session {name}: {reason}")]
    AttachFailed { name: String, reason: String },
    #[error("{0} cannot create detached sessions")]
    DetachedModeNotSupported(&'static str),
    #[error("{program} {command} failed: {stderr}")]
    CommandFailed { program: String, command: String, stderr: String },
    #[error(transparent)]
    Exec(#[from] hjk_exec::ExecError),
}
