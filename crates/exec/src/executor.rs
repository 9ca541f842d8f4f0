//! The executor contract.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Where a child's output stream goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sink {
    /// Capture into the returned [`ExecOutput`].
    #[default]
    Capture,
    /// Forward to the calling process's own stream; captured bytes stay empty.
    Inherit,
    /// Discard.
    Null,
}

/// A fully-described external command.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub program: String,
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Variables removed from the child's environment (e.g. `GIT_DIR`).
    pub env_remove: Vec<String>,
    pub stdin: Option<Vec<u8>>,
    pub stdout: Sink,
    pub stderr: Sink,
    pub cancel: CancellationToken,
}

impl ExecRequest {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            env: Vec::new(),
            env_remove: Vec::new(),
            stdin: None,
            stdout: Sink::Capture,
            stderr: Sink::Capture,
            cancel: CancellationToken::new(),
        }
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    pub fn stdin(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(bytes.into());
        self
    }

    pub fn stdout(mut self, sink: Sink) -> Self {
        self.stdout = sink;
        self
    }

    pub fn stderr(mut self, sink: Sink) -> Self {
        self.stderr = sink;
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// What came back from a finished child.
///
/// A non-zero exit is not an error at this layer; callers decide.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Trimmed stderr, for embedding in error messages.
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    /// Trimmed stdout lines.
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout_str().lines().map(|l| l.trim_end().to_string()).collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("command not found: {0}")]
    NotFound(String),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stdin is not a terminal")]
    NotATerminal,
    #[error("cancelled")]
    Cancelled,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs external commands. One production implementation
/// ([`SystemExecutor`](crate::SystemExecutor)) plus a scripted fake for
/// tests.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run to completion, honoring the request's sinks and cancellation
    /// token. Non-zero exit codes are returned, not raised.
    async fn run(&self, req: ExecRequest) -> Result<ExecOutput, ExecError>;

    /// Resolve a program name against `PATH`.
    fn look_path(&self, name: &str) -> Result<PathBuf, ExecError>;

    /// Run with all three stdio streams inherited so the child owns the
    /// terminal (tmux attach, interactive exec, credential capture).
    /// Blocks until the child exits; returns its exit code. Fails with
    /// [`ExecError::NotATerminal`] when stdin is not a TTY.
    fn run_interactive(&self, program: &str, args: &[String]) -> Result<i32, ExecError>;
}
