//! Scripted executor for tests: records every call and replays canned
//! outputs matched on program name + argument prefix.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::executor::{ExecError, ExecOutput, ExecRequest, Executor};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecCall {
    pub program: String,
    pub args: Vec<String>,
    pub interactive: bool,
}

struct Rule {
    program: String,
    args_prefix: Vec<String>,
    output: ExecOutput,
}

#[derive(Default)]
struct Inner {
    rules: Vec<Rule>,
    calls: Vec<ExecCall>,
}

/// Call-recording fake. Later rules win over earlier ones so tests can
/// override a default; unmatched calls succeed with empty output.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    inner: Arc<Mutex<Inner>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for calls to `program` whose args start with
    /// `args_prefix`.
    pub fn on<I, S>(&self, program: &str, args_prefix: I, output: ExecOutput) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.lock().rules.push(Rule {
            program: program.to_string(),
            args_prefix: args_prefix.into_iter().map(Into::into).collect(),
            output,
        });
        self
    }

    /// Script a zero-exit response with the given stdout.
    pub fn on_ok<I, S>(&self, program: &str, args_prefix: I, stdout: &str) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on(program, args_prefix, ok(stdout))
    }

    /// Script a non-zero response with the given stderr.
    pub fn on_fail<I, S>(&self, program: &str, args_prefix: I, code: i32, stderr: &str) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on(
            program,
            args_prefix,
            ExecOutput { stdout: Vec::new(), stderr: stderr.as_bytes().to_vec(), code },
        )
    }

    pub fn calls(&self) -> Vec<ExecCall> {
        self.inner.lock().calls.clone()
    }

    /// Calls made to the given program.
    pub fn calls_to(&self, program: &str) -> Vec<ExecCall> {
        self.calls().into_iter().filter(|c| c.program == program).collect()
    }

    fn record_and_match(&self, call: ExecCall) -> ExecOutput {
        let mut inner = self.inner.lock();
        let found = inner
            .rules
            .iter()
            .rev()
            .find(|r| {
                r.program == call.program
                    && call.args.len() >= r.args_prefix.len()
                    && r.args_prefix.iter().zip(&call.args).all(|(a, b)| a == b)
            })
            .map(|r| r.output.clone())
            .unwrap_or_default();
        inner.calls.push(call);
        found
    }
}

/// A zero-exit [`ExecOutput`] with the given stdout.
pub fn ok(stdout: &str) -> ExecOutput {
    ExecOutput { stdout: stdout.as_bytes().to_vec(), stderr: Vec::new(), code: 0 }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn run(&self, req: ExecRequest) -> Result<ExecOutput, ExecError> {
        Ok(self.record_and_match(ExecCall {
            program: req.program,
            args: req.args,
            interactive: false,
        }))
    }

    fn look_path(&self, name: &str) -> Result<PathBuf, ExecError> {
        Ok(PathBuf::from(format!("/usr/bin/{}", name)))
    }

    fn run_interactive(&self, program: &str, args: &[String]) -> Result<i32, ExecError> {
        let output = self.record_and_match(ExecCall {
            program: program.to_string(),
            args: args.to_vec(),
            interactive: true,
        });
        Ok(output.code)
    }
}
