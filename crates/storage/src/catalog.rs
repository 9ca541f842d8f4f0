//! The instance catalog: a single file-locked, atomically-rewritten JSON
//! document, safe under concurrent CLI processes.
//!
//! Every operation opens the catalog file, takes the advisory lock (shared
//! for reads, exclusive for writes), re-reads the current contents, applies
//! its change, and rewrites via tempfile + rename. Callers never mutate a
//! stale in-memory copy.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use hjk_core::{Instance, InstanceId, InstanceStatus};

/// Current on-disk schema version. Version 1 predates per-instance session
/// lists; its entries migrate in memory and persist as version 2 on the
/// next mutation.
pub const CURRENT_CATALOG_VERSION: u32 = 2;

const LOCK_POLL: Duration = Duration::from_millis(10);
const LOCK_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("an instance already exists for {repo_id}:{branch}")]
    AlreadyExists { repo_id: String, branch: String },
    #[error("timed out waiting for the catalog lock")]
    LockTimeout,
    #[error("cancelled")]
    Cancelled,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Decode(e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    version: u32,
    entries: Vec<Instance>,
}

impl Default for CatalogFile {
    fn default() -> Self {
        Self { version: CURRENT_CATALOG_VERSION, entries: Vec::new() }
    }
}

/// Filter for [`Catalog::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub repo_id: Option<String>,
    pub status: Option<InstanceStatus>,
}

impl ListFilter {
    fn matches(&self, e: &Instance) -> bool {
        if let Some(repo_id) = &self.repo_id {
            if &e.repo_id != repo_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if e.status != status {
                return false;
            }
        }
        true
    }
}

/// Durable registry of instances and their sessions.
pub struct Catalog {
    path: PathBuf,
    // Serializes operations within this process; the file lock handles
    // other processes.
    guard: tokio::sync::RwLock<()>,
}

impl Catalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: tokio::sync::RwLock::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register a new instance. Fails with `AlreadyExists` when the
    /// `(repo_id, branch)` pair is already present.
    pub async fn add(&self, entry: Instance, cancel: &CancellationToken) -> Result<(), CatalogError> {
        let _guard = self.guard.write().await;
        self.with_locked_file(true, cancel, move |doc| {
            if doc.entries.iter().any(|e| e.repo_id == entry.repo_id && e.branch == entry.branch) {
                return Err(CatalogError::AlreadyExists {
                    repo_id: entry.repo_id.clone(),
                    branch: entry.branch.clone(),
                });
            }
            doc.entries.push(entry);
            Ok(((), true))
        })
        .await
    }

    pub async fn get(
        &self,
        id: &InstanceId,
        cancel: &CancellationToken,
    ) -> Result<Instance, CatalogError> {
        let _guard = self.guard.read().await;
        let id = id.clone();
        self.with_locked_file(false, cancel, move |doc| {
            let found = doc
                .entries
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(format!("instance {}", id)))?;
            Ok((found, false))
        })
        .await
    }

    pub async fn get_by_repo_branch(
        &self,
        repo_id: &str,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<Instance, CatalogError> {
        let _guard = self.guard.read().await;
        let repo_id = repo_id.to_string();
        let branch = branch.to_string();
        self.with_locked_file(false, cancel, move |doc| {
            let found = doc
                .entries
                .iter()
                .find(|e| e.repo_id == repo_id && e.branch == branch)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(format!("branch '{}'", branch)))?;
            Ok((found, false))
        })
        .await
    }

    /// Replace the stored entry with the same id.
    pub async fn update(
        &self,
        entry: Instance,
        cancel: &CancellationToken,
    ) -> Result<(), CatalogError> {
        let _guard = self.guard.write().await;
        self.with_locked_file(true, cancel, move |doc| {
            let slot = doc
                .entries
                .iter_mut()
                .find(|e| e.id == entry.id)
                .ok_or_else(|| CatalogError::NotFound(format!("instance {}", entry.id)))?;
            *slot = entry;
            Ok(((), true))
        })
        .await
    }

    pub async fn remove(
        &self,
        id: &InstanceId,
        cancel: &CancellationToken,
    ) -> Result<(), CatalogError> {
        let _guard = self.guard.write().await;
        let id = id.clone();
        self.with_locked_file(true, cancel, move |doc| {
            let before = doc.entries.len();
            doc.entries.retain(|e| e.id != id);
            if doc.entries.len() == before {
                return Err(CatalogError::NotFound(format!("instance {}", id)));
            }
            Ok(((), true))
        })
        .await
    }

    pub async fn list(
        &self,
        filter: ListFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Instance>, CatalogError> {
        let _guard = self.guard.read().await;
        self.with_locked_file(false, cancel, move |doc| {
            let matched = doc.entries.iter().filter(|e| filter.matches(e)).cloned().collect();
            Ok((matched, false))
        })
        .await
    }

    /// Open the catalog file, acquire the advisory lock, run `op` on the
    /// parsed document, and atomically rewrite when `op` reports a change.
    async fn with_locked_file<T>(
        &self,
        exclusive: bool,
        cancel: &CancellationToken,
        op: impl FnOnce(&mut CatalogFile) -> Result<(T, bool), CatalogError>,
    ) -> Result<T, CatalogError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Open without truncating: the contents belong to whoever holds
        // the lock.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        self.acquire_lock(&file, exclusive, cancel).await?;
        let result = (|| {
            let mut doc = read_document(&file)?;
            let (value, dirty) = op(&mut doc)?;
            if dirty {
                doc.version = CURRENT_CATALOG_VERSION;
                write_document(&self.path, &doc)?;
            }
            Ok(value)
        })();
        let _ = FileExt::unlock(&file);
        result
    }

    async fn acquire_lock(
        &self,
        file: &File,
        exclusive: bool,
        cancel: &CancellationToken,
    ) -> Result<(), CatalogError> {
        let deadline = std::time::Instant::now() + LOCK_DEADLINE;
        loop {
            // UFCS: newer std has same-named inherent methods on File.
            let attempt = if exclusive {
                FileExt::try_lock_exclusive(file)
            } else {
                FileExt::try_lock_shared(file)
            };
            match attempt {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if cancel.is_cancelled() {
                        return Err(CatalogError::Cancelled);
                    }
                    if std::time::Instant::now() >= deadline {
                        return Err(CatalogError::LockTimeout);
                    }
                    tokio::time::sleep(LOCK_POLL).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn read_document(mut file: &File) -> Result<CatalogFile, CatalogError> {
    file.rewind()?;
    let mut raw = String::new();
    file.read_to_string(&mut raw)?;
    if raw.trim().is_empty() {
        return Ok(CatalogFile::default());
    }

    let doc: CatalogFile = serde_json::from_str(&raw)?;
    if doc.version == 0 || doc.version > CURRENT_CATALOG_VERSION {
        return Err(CatalogError::Decode(format!(
            "unsupported catalog version {} (expected 1..={})",
            doc.version, CURRENT_CATALOG_VERSION
        )));
    }
    // Session names parse by splitting on `-`; ids containing one are
    // ambiguous and refused rather than guessed at.
    for entry in &doc.entries {
        if !entry.id.is_parseable() {
            return Err(CatalogError::Decode(format!(
                "instance id {:?} contains '-' and cannot name mux sessions",
                entry.id.as_str()
            )));
        }
        for session in &entry.sessions {
            if !session.id.is_parseable() {
                return Err(CatalogError::Decode(format!(
                    "session id {:?} in instance {} contains '-'",
                    session.id.as_str(),
                    entry.id
                )));
            }
        }
    }
    Ok(doc)
}

/// Serialize to a sibling temp file, fsync, then rename over the target.
fn write_document(path: &Path, doc: &CatalogFile) -> Result<(), CatalogError> {
    let tmp = path.with_extension("json.tmp");
    let result = (|| {
        let mut out = File::create(&tmp)?;
        out.write_all(&serde_json::to_vec_pretty(doc)?)?;
        out.write_all(b"\n")?;
        out.sync_all()?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
