//! User configuration: `~/.config/headjack/config.toml` plus environment
//! overrides (`HEADJACK_DEFAULT_AGENT`, `HEADJACK_BASE_IMAGE`,
//! `HEADJACK_WORKTREE_DIR`).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hjk_core::AgentKind;
use hjk_mux::MuxKind;
use hjk_runtime::RuntimeKind;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    pub command: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub runtime: RuntimeKind,
    pub mux: MuxKind,
    pub base_image: String,
    pub default_agent: AgentKind,
    /// Override for the worktrees root (else `<state>/worktrees`).
    pub worktree_dir: Option<PathBuf>,
    /// Shell launched by plain `exec` sessions.
    pub shell: String,
    /// Per-agent command overrides.
    pub agents: BTreeMap<String, AgentSettings>,
    /// Extra runtime flags (the config layer of the flag merge).
    pub runtime_flags: toml::value::Table,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            runtime: RuntimeKind::Docker,
            mux: MuxKind::Tmux,
            base_image: "ghcr.io/headjack-dev/base:latest".to_string(),
            default_agent: AgentKind::Claude,
            worktree_dir: None,
            shell: "bash".to_string(),
            agents: BTreeMap::new(),
            runtime_flags: toml::value::Table::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {var}: {value:?}")]
    Env { var: &'static str, value: String },
}

impl Settings {
    /// Load from a config file (when it exists) and fold in environment
    /// overrides.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let mut settings = if path.is_file() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| SettingsError::Read { path: path.to_path_buf(), source: e })?;
            toml::from_str(&raw)
                .map_err(|e| SettingsError::Parse { path: path.to_path_buf(), source: e })?
        } else {
            Settings::default()
        };
        settings.apply_env()?;
        Ok(settings)
    }

    fn apply_env(&mut self) -> Result<(), SettingsError> {
        if let Ok(agent) = std::env::var("HEADJACK_DEFAULT_AGENT") {
            self.default_agent = AgentKind::parse(&agent)
                .ok_or(SettingsError::Env { var: "HEADJACK_DEFAULT_AGENT", value: agent })?;
        }
        if let Ok(image) = std::env::var("HEADJACK_BASE_IMAGE") {
            if !image.is_empty() {
                self.base_image = image;
            }
        }
        if let Ok(dir) = std::env::var("HEADJACK_WORKTREE_DIR") {
            if !dir.is_empty() {
                self.worktree_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(())
    }

    /// The command launched for an agent session, before any prompt.
    pub fn agent_command(&self, agent: AgentKind) -> String {
        self.agents
            .get(agent.as_str())
            .map(|a| a.command.clone())
            .unwrap_or_else(|| agent.as_str().to_string())
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
