//! Tee writers: duplicate a stream into a session log file.
//!
//! The file is written first so the log never lags what the user saw.
//! A [`SessionWriters`] bundle shares one log file between stdout and
//! stderr, keeping interleaving in the log chronological.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

type Primary = Box<dyn Write + Send>;

/// Writes to a log file and, optionally, a primary writer.
///
/// Clones share the underlying file; [`SessionWriters`] uses this to keep
/// stdout and stderr on one file.
pub struct TeeWriter {
    file: Arc<Mutex<Option<File>>>,
    primary: Mutex<Option<Primary>>,
}

impl TeeWriter {
    /// Create, truncating any existing log.
    pub fn create(path: &Path, primary: Option<Primary>) -> std::io::Result<Self> {
        Ok(Self::from_file(File::create(path)?, primary))
    }

    /// Create, appending to any existing log.
    pub fn append(path: &Path, primary: Option<Primary>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_file(file, primary))
    }

    fn from_file(file: File, primary: Option<Primary>) -> Self {
        Self { file: Arc::new(Mutex::new(Some(file))), primary: Mutex::new(primary) }
    }

    /// A second writer over the same log file with its own primary.
    pub fn sibling(&self, primary: Option<Primary>) -> Self {
        Self { file: Arc::clone(&self.file), primary: Mutex::new(primary) }
    }

    /// Flush the log file to disk.
    pub fn sync(&self) -> std::io::Result<()> {
        let mut file = self.file.lock();
        if let Some(file) = file.as_mut() {
            file.flush()?;
            file.sync_data()?;
        }
        Ok(())
    }

    /// Close the log file (for every writer sharing it). The primary
    /// writer, if any, stays open; it belongs to the caller.
    pub fn close(&self) -> std::io::Result<()> {
        if let Some(mut file) = self.file.lock().take() {
            file.flush()?;
        }
        Ok(())
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // File first, then the primary.
        {
            let mut file = self.file.lock();
            if let Some(file) = file.as_mut() {
                file.write_all(buf)?;
            }
        }
        let mut primary = self.primary.lock();
        if let Some(primary) = primary.as_mut() {
            primary.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        {
            let mut file = self.file.lock();
            if let Some(file) = file.as_mut() {
                file.flush()?;
            }
        }
        let mut primary = self.primary.lock();
        if let Some(primary) = primary.as_mut() {
            primary.flush()?;
        }
        Ok(())
    }
}

/// Paired stdout/stderr tees over a single shared log file.
pub struct SessionWriters {
    pub stdout: TeeWriter,
    pub stderr: TeeWriter,
}

impl SessionWriters {
    /// Both streams tee into the same (truncated) log file; each may also
    /// forward to its own primary writer.
    pub fn create(
        path: &Path,
        stdout_primary: Option<Primary>,
        stderr_primary: Option<Primary>,
    ) -> std::io::Result<Self> {
        let stdout = TeeWriter::create(path, stdout_primary)?;
        let stderr = stdout.sibling(stderr_primary);
        Ok(Self { stdout, stderr })
    }

    /// Append variant for resumed sessions.
    pub fn append(
        path: &Path,
        stdout_primary: Option<Primary>,
        stderr_primary: Option<Primary>,
    ) -> std::io::Result<Self> {
        let stdout = TeeWriter::append(path, stdout_primary)?;
        let stderr = stdout.sibling(stderr_primary);
        Ok(Self { stdout, stderr })
    }

    pub fn sync(&self) -> std::io::Result<()> {
        self.stdout.sync()
    }

    pub fn close(&self) -> std::io::Result<()> {
        self.stdout.close()
    }
}

#[cfg(test)]
#[path = "tee_tests.rs"]
mod tests;
