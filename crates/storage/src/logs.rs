//! Session log path layout: `<logs_root>/<instance>/<session>.log`.

use std::path::{Path, PathBuf};

use hjk_core::{InstanceId, SessionId};

/// Resolves and manages the on-disk layout of session logs.
#[derive(Debug, Clone)]
pub struct LogLayout {
    root: PathBuf,
}

impl LogLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn instance_dir(&self, instance: &InstanceId) -> PathBuf {
        self.root.join(instance.as_str())
    }

    pub fn session_log(&self, instance: &InstanceId, session: &SessionId) -> PathBuf {
        self.instance_dir(instance).join(format!("{}.log", session))
    }

    pub fn ensure_instance_dir(&self, instance: &InstanceId) -> std::io::Result<PathBuf> {
        let dir = self.instance_dir(instance);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Resolve a session's log path, creating the parent directory.
    pub fn ensure_session_log(
        &self,
        instance: &InstanceId,
        session: &SessionId,
    ) -> std::io::Result<PathBuf> {
        self.ensure_instance_dir(instance)?;
        Ok(self.session_log(instance, session))
    }

    pub fn log_exists(&self, instance: &InstanceId, session: &SessionId) -> bool {
        self.session_log(instance, session).is_file()
    }

    pub fn remove_session_log(
        &self,
        instance: &InstanceId,
        session: &SessionId,
    ) -> std::io::Result<()> {
        match std::fs::remove_file(self.session_log(instance, session)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn remove_instance_logs(&self, instance: &InstanceId) -> std::io::Result<()> {
        match std::fs::remove_dir_all(self.instance_dir(instance)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Session IDs with a log file under the instance's log dir.
    pub fn list_session_logs(&self, instance: &InstanceId) -> std::io::Result<Vec<SessionId>> {
        let dir = self.instance_dir(instance);
        let mut found = Vec::new();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let path = entry?.path();
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if path.extension().and_then(|e| e.to_str()) == Some("log") {
                    found.push(SessionId::from(stem));
                }
            }
        }
        found.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(found)
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
