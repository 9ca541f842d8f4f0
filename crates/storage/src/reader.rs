//! Session log reading: whole-file, last-N tail, and follow.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use hjk_core::{InstanceId, SessionId};

use crate::logs::LogLayout;

/// How many lines `tail` shows by default.
pub const DEFAULT_TAIL_LINES: usize = 100;

/// Reads a single session's log.
pub struct LogReader {
    path: PathBuf,
}

impl LogReader {
    pub fn new(layout: &LogLayout, instance: &InstanceId, session: &SessionId) -> Self {
        Self { path: layout.session_log(instance, session) }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// The entire log as lines.
    pub fn read_all(&self) -> std::io::Result<Vec<String>> {
        let file = std::fs::File::open(&self.path)?;
        BufReader::new(file).lines().collect()
    }

    /// The last `n` lines, buffered through a ring so large logs never
    /// load whole into memory.
    pub fn read_last_n(&self, n: usize) -> std::io::Result<Vec<String>> {
        let file = std::fs::File::open(&self.path)?;
        let mut ring: VecDeque<String> = VecDeque::with_capacity(n.min(4096));
        for line in BufReader::new(file).lines() {
            let line = line?;
            if n == 0 {
                continue;
            }
            if ring.len() == n {
                ring.pop_front();
            }
            ring.push_back(line);
        }
        Ok(ring.into_iter().collect())
    }

    /// Follow the log from EOF: on each tick, emit any newly-buffered
    /// bytes (including a partial, unterminated trailing line) to `out`.
    /// Returns when cancelled.
    pub async fn follow(
        &self,
        interval: Duration,
        cancel: &CancellationToken,
        out: &mut (dyn Write + Send),
    ) -> std::io::Result<()> {
        let offset = std::fs::metadata(&self.path)?.len();
        self.follow_from(offset, interval, cancel, out).await
    }

    /// Emit the last `n` lines, then follow.
    pub async fn follow_with_history(
        &self,
        n: usize,
        interval: Duration,
        cancel: &CancellationToken,
        out: &mut (dyn Write + Send),
    ) -> std::io::Result<()> {
        // Capture the offset first so lines written between the tail read
        // and the follow loop are not dropped.
        let offset = std::fs::metadata(&self.path)?.len();
        for line in self.read_last_n(n)? {
            writeln!(out, "{}", line)?;
        }
        self.follow_from(offset, interval, cancel, out).await
    }

    async fn follow_from(
        &self,
        mut offset: u64,
        interval: Duration,
        cancel: &CancellationToken,
        out: &mut (dyn Write + Send),
    ) -> std::io::Result<()> {
        let mut file = std::fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(8 * 1024);
        loop {
            buf.clear();
            file.read_to_end(&mut buf)?;
            if !buf.is_empty() {
                offset += buf.len() as u64;
                out.write_all(&buf)?;
                out.flush()?;
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(interval) => {}
            }
            // If the file was truncated underneath us (session recreated),
            // start over from the top.
            let len = std::fs::metadata(&self.path)?.len();
            if len < offset {
                file.seek(SeekFrom::Start(0))?;
                offset = 0;
            }
        }
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
