//! Instance and session catalog records.
//!
//! An instance pairs a branch's git worktree with a managed container and
//! owns an ordered list of multiplexer sessions. `(repo_id, branch)` is
//! unique across the catalog: strictly one instance per branch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::id::{mux_name, InstanceId, SessionId};

/// Lifecycle status of an instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// Worktree and container are being provisioned
    #[default]
    Creating,
    /// Container is running
    Running,
    /// Container stopped; worktree retained
    Stopped,
    /// Provisioning or a lifecycle operation failed
    Error,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Creating => write!(f, "creating"),
            InstanceStatus::Running => write!(f, "running"),
            InstanceStatus::Stopped => write!(f, "stopped"),
            InstanceStatus::Error => write!(f, "error"),
        }
    }
}

/// The coding agents headjack knows how to authenticate and launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
    Gemini,
    Codex,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Claude, AgentKind::Gemini, AgentKind::Codex];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Gemini => "gemini",
            AgentKind::Codex => "codex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "claude" => Some(AgentKind::Claude),
            "gemini" => Some(AgentKind::Gemini),
            "codex" => Some(AgentKind::Codex),
            _ => None,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a session runs: a plain shell or one of the agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Shell,
    Claude,
    Gemini,
    Codex,
}

impl SessionKind {
    /// The agent behind this session, if any.
    pub fn agent(&self) -> Option<AgentKind> {
        match self {
            SessionKind::Shell => None,
            SessionKind::Claude => Some(AgentKind::Claude),
            SessionKind::Gemini => Some(AgentKind::Gemini),
            SessionKind::Codex => Some(AgentKind::Codex),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "shell" => Some(SessionKind::Shell),
            "claude" => Some(SessionKind::Claude),
            "gemini" => Some(SessionKind::Gemini),
            "codex" => Some(SessionKind::Codex),
            _ => None,
        }
    }
}

impl From<AgentKind> for SessionKind {
    fn from(agent: AgentKind) -> Self {
        match agent {
            AgentKind::Claude => SessionKind::Claude,
            AgentKind::Gemini => SessionKind::Gemini,
            AgentKind::Codex => SessionKind::Codex,
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Shell => write!(f, "shell"),
            SessionKind::Claude => write!(f, "claude"),
            SessionKind::Gemini => write!(f, "gemini"),
            SessionKind::Codex => write!(f, "codex"),
        }
    }
}

/// A persistent, attachable terminal session inside an instance's container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    /// Human-readable name, unique within the instance.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    /// Namespaced multiplexer session name: `hjk-<instance>-<session>`.
    pub mux_session: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(instance: &InstanceId, name: impl Into<String>, kind: SessionKind) -> Self {
        let id = SessionId::generate();
        let mux_session = mux_name(instance, &id);
        let now = Utc::now();
        Self { id, name: name.into(), kind, mux_session, created_at: now, last_accessed: now }
    }

    /// Record an attach (or other access) at the current time.
    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }
}

/// The durable unit: a branch's worktree paired with a managed container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    /// Absolute host path to the source repository.
    pub repo: PathBuf,
    /// Stable repository identity: `<basename>-<first7-of-root-commit>`.
    pub repo_id: String,
    /// Branch name as given (may contain `/`).
    pub branch: String,
    /// Absolute host path to the branch's worktree.
    pub worktree: PathBuf,
    /// Runtime-assigned container id; empty while creating or after removal.
    #[serde(default)]
    pub container_id: String,
    pub created_at: DateTime<Utc>,
    pub status: InstanceStatus,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    /// Remote user reported by the devcontainer tool, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_user: Option<String>,
    /// Remote workspace folder reported by the devcontainer tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_workdir: Option<String>,
}

impl Instance {
    pub fn new(
        repo: PathBuf,
        repo_id: impl Into<String>,
        branch: impl Into<String>,
        worktree: PathBuf,
    ) -> Self {
        Self {
            id: InstanceId::generate(),
            repo,
            repo_id: repo_id.into(),
            branch: branch.into(),
            worktree,
            container_id: String::new(),
            created_at: Utc::now(),
            status: InstanceStatus::Creating,
            sessions: Vec::new(),
            remote_user: None,
            remote_workdir: None,
        }
    }

    pub fn session_by_name(&self, name: &str) -> Option<&SessionRecord> {
        self.sessions.iter().find(|s| s.name == name)
    }

    pub fn session_by_name_mut(&mut self, name: &str) -> Option<&mut SessionRecord> {
        self.sessions.iter_mut().find(|s| s.name == name)
    }

    /// The session most recently accessed, if any.
    pub fn most_recent_session(&self) -> Option<&SessionRecord> {
        self.sessions.iter().max_by_key(|s| s.last_accessed)
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
