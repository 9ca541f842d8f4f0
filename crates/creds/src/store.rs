//! Credential records and the secret store seam.
//!
//! The OS keyring proper is outside this crate; everything here talks to
//! a [`KeyValueSecretStore`]. The shipped backend is a mode-0600 JSON
//! file under the state dir so `hjk auth` works with zero setup.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use hjk_core::AgentKind;

/// How the stored value authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// Seat-based login: OAuth token or auth-file contents.
    Subscription,
    /// Plain API key.
    ApiKey,
}

/// One stored credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "type")]
    pub kind: CredentialKind,
    pub value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CredError {
    #[error("no credential stored for {0}; run `hjk auth {0}` first")]
    AuthRequired(AgentKind),
    #[error("invalid credential for {agent}: {reason}")]
    AuthInvalid { agent: AgentKind, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The seam to the secret backend (keyring, file, memory).
pub trait KeyValueSecretStore: Send + Sync {
    fn get(&self, account: &str) -> Result<Option<String>, CredError>;
    fn set(&self, account: &str, value: &str) -> Result<(), CredError>;
    fn delete(&self, account: &str) -> Result<(), CredError>;
}

/// Typed credential access over a secret store.
pub struct CredentialStore {
    backend: Box<dyn KeyValueSecretStore>,
}

impl CredentialStore {
    pub fn new(backend: Box<dyn KeyValueSecretStore>) -> Self {
        Self { backend }
    }

    fn account(agent: AgentKind) -> String {
        format!("headjack-{}", agent)
    }

    pub fn load(&self, agent: AgentKind) -> Result<Credential, CredError> {
        let raw = self
            .backend
            .get(&Self::account(agent))?
            .ok_or(CredError::AuthRequired(agent))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, agent: AgentKind, credential: &Credential) -> Result<(), CredError> {
        let raw = serde_json::to_string(credential)?;
        self.backend.set(&Self::account(agent), &raw)
    }

    pub fn forget(&self, agent: AgentKind) -> Result<(), CredError> {
        self.backend.delete(&Self::account(agent))
    }
}

/// JSON-file secret store, created mode 0600.
pub struct FileSecretStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, CredError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            Ok(_) => Ok(BTreeMap::new()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), CredError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueSecretStore for FileSecretStore {
    fn get(&self, account: &str) -> Result<Option<String>, CredError> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.get(account).cloned())
    }

    fn set(&self, account: &str, value: &str) -> Result<(), CredError> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        map.insert(account.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn delete(&self, account: &str) -> Result<(), CredError> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        map.remove(account);
        self.write_map(&map)
    }
}

/// In-memory store for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct MemorySecretStore {
    map: Mutex<BTreeMap<String, String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl KeyValueSecretStore for MemorySecretStore {
    fn get(&self, account: &str) -> Result<Option<String>, CredError> {
        Ok(self.map.lock().get(account).cloned())
    }

    fn set(&self, account: &str, value: &str) -> Result<(), CredError> {
        self.map.lock().insert(account.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, account: &str) -> Result<(), CredError> {
        self.map.lock().remove(account);
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
