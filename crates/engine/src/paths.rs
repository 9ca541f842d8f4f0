//! On-disk layout of per-user state.
//!
//! Everything lives under one state dir (default
//! `~/.local/share/headjack`, override `HEADJACK_STATE_DIR`):
//! `catalog.json`, `worktrees/`, `logs/`, `secrets.json`. The config file
//! resolves separately (`~/.config/headjack/config.toml`, override
//! `HEADJACK_CONFIG`).

use std::path::PathBuf;

use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct StatePaths {
    pub state_dir: PathBuf,
    pub catalog: PathBuf,
    pub worktrees_root: PathBuf,
    pub logs_root: PathBuf,
    pub secrets: PathBuf,
}

impl StatePaths {
    /// Resolve against the environment and the loaded settings.
    pub fn resolve(settings: &Settings) -> Self {
        let state_dir = std::env::var_os("HEADJACK_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("headjack")
            });
        Self::under(state_dir, settings)
    }

    /// Layout rooted at an explicit state dir (tests, custom setups).
    pub fn under(state_dir: PathBuf, settings: &Settings) -> Self {
        let worktrees_root = settings
            .worktree_dir
            .clone()
            .unwrap_or_else(|| state_dir.join("worktrees"));
        Self {
            catalog: state_dir.join("catalog.json"),
            logs_root: state_dir.join("logs"),
            secrets: state_dir.join("secrets.json"),
            worktrees_root,
            state_dir,
        }
    }

    /// The config file path (not under the state dir).
    pub fn config_file() -> PathBuf {
        if let Some(path) = std::env::var_os("HEADJACK_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("headjack")
            .join("config.toml")
    }
}
