//! Session lifecycle: create, attach (MRU resolution), kill, logs glue.

use std::path::Path;
use tokio_util::sync::CancellationToken;

use hjk_core::{
    random_session_name, sh_join, sh_quote, Instance, SessionKind, SessionRecord,
};
use hjk_creds::injection_for;
use hjk_mux::{CreateSession, MuxError};

use crate::error::EngineError;
use crate::manager::InstanceManager;

/// How many auto-generated names we try before giving up.
const NAME_ATTEMPTS: usize = 16;

/// What to open inside an instance.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub kind: SessionKind,
    /// Explicit name; auto-generated (`adjective_noun`) when None.
    pub name: Option<String>,
    /// Full command override (the `exec <cmd...>` path).
    pub command_override: Option<String>,
    /// Prompt appended (quoted) to an agent command.
    pub prompt: Option<String>,
    pub env_extra: Vec<(String, String)>,
    /// Leave the session detached instead of attaching right away.
    pub detached: bool,
}

impl SessionSpec {
    pub fn agent(kind: SessionKind) -> Self {
        Self {
            kind,
            name: None,
            command_override: None,
            prompt: None,
            env_extra: Vec::new(),
            detached: false,
        }
    }

    pub fn shell() -> Self {
        Self::agent(SessionKind::Shell)
    }
}

/// Resolved attach scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachTarget {
    pub branch: String,
    pub session: String,
}

impl InstanceManager {
    /// Open a session in the instance for `branch`. The instance must
    /// exist (`run` provisions; `agent`/`exec` don't). Restarts a stopped
    /// container first.
    pub async fn create_session(
        &self,
        repo_dir: &Path,
        branch: &str,
        spec: SessionSpec,
        cancel: &CancellationToken,
    ) -> Result<(Instance, SessionRecord), EngineError> {
        let entry = self.entry_for_branch(repo_dir, branch, cancel).await?;
        let entry = self.resume_if_stopped(entry, cancel).await?;
        self.create_session_in(entry, spec, cancel).await
    }

    /// Like [`create_session`](Self::create_session) but for an entry the
    /// caller already holds (the `run` path, straight after ensure).
    pub async fn create_session_in(
        &self,
        mut entry: Instance,
        spec: SessionSpec,
        cancel: &CancellationToken,
    ) -> Result<(Instance, SessionRecord), EngineError> {
        // A name the user picked must be free; auto names retry below.
        if let Some(name) = &spec.name {
            if entry.session_by_name(name).is_some() {
                return Err(EngineError::SessionNameTaken(name.clone()));
            }
        }

        let command = self.session_command(&spec)?;
        let env = self.session_env(&entry, &spec)?;

        let mut attempt = 0;
        let record = loop {
            let name = match &spec.name {
                Some(name) => name.clone(),
                None => {
                    let mut candidate = random_session_name();
                    let mut tries = 0;
                    while entry.session_by_name(&candidate).is_some() {
                        tries += 1;
                        if tries >= NAME_ATTEMPTS {
                            return Err(EngineError::SessionNameTaken(candidate));
                        }
                        candidate = random_session_name();
                    }
                    candidate
                }
            };

            let record = SessionRecord::new(&entry.id, &name, spec.kind);
            let log_path = self.logs.ensure_session_log(&entry.id, &record.id)?;
            let child = self.in_container_command(&entry, &env, &command);

            let create = CreateSession {
                name: record.mux_session.clone(),
                command: Some(child),
                cwd: Some(entry.worktree.clone()),
                env: vec![
                    ("HEADJACK_INSTANCE".to_string(), entry.id.to_string()),
                    ("HEADJACK_SESSION".to_string(), name.clone()),
                ],
                log_path: Some(log_path),
            };
            match self.mux.create_session(&create, cancel).await {
                Ok(()) => break record,
                Err(MuxError::SessionExists(_)) if spec.name.is_none() => {
                    attempt += 1;
                    if attempt >= NAME_ATTEMPTS {
                        return Err(MuxError::SessionExists(record.mux_session).into());
                    }
                }
                Err(MuxError::SessionExists(_)) => {
                    return Err(EngineError::SessionNameTaken(
                        spec.name.clone().unwrap_or_default(),
                    ))
                }
                Err(e) => return Err(e.into()),
            }
        };

        entry.sessions.push(record.clone());
        self.catalog.update(entry.clone(), cancel).await?;
        tracing::info!(session = %record.mux_session, name = %record.name, "session created");

        if !spec.detached {
            self.mux.attach_session(&record.mux_session)?;
            self.touch_session(&entry, &record.name, cancel).await?;
        }
        Ok((entry, record))
    }

    /// Resolve an attach request per the MRU rules: no args → most recent
    /// session anywhere; branch → most recent within that instance;
    /// branch + session → exact.
    pub async fn resolve_attach(
        &self,
        repo_dir: &Path,
        branch: Option<&str>,
        session: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AttachTarget, EngineError> {
        match branch {
            None => {
                let entries = self.catalog.list(Default::default(), cancel).await?;
                if entries.is_empty() {
                    return Err(EngineError::NoSession { scope: None });
                }
                let live = self.mux.list_sessions(cancel).await?;
                let mut best: Option<(Instance, SessionRecord)> = None;
                for entry in entries {
                    let entry = self.reconcile(entry, &live, cancel).await?;
                    for session in &entry.sessions {
                        let newer = best
                            .as_ref()
                            .map(|(_, b)| session.last_accessed > b.last_accessed)
                            .unwrap_or(true);
                        if newer {
                            best = Some((entry.clone(), session.clone()));
                        }
                    }
                }
                let (entry, record) = best.ok_or(EngineError::NoSession { scope: None })?;
                Ok(AttachTarget { branch: entry.branch, session: record.name })
            }
            Some(branch) => {
                let entry = self.entry_for_branch(repo_dir, branch, cancel).await?;
                let live = self.mux.list_sessions(cancel).await?;
                let entry = self.reconcile(entry, &live, cancel).await?;
                let record = match session {
                    Some(name) => entry.session_by_name(name).cloned().ok_or_else(|| {
                        EngineError::NoSession {
                            scope: Some(format!("'{}/{}'", branch, name)),
                        }
                    })?,
                    None => entry
                        .most_recent_session()
                        .cloned()
                        .ok_or_else(|| EngineError::NoSession {
                            scope: Some(format!("branch '{}'", branch)),
                        })?,
                };
                Ok(AttachTarget { branch: entry.branch, session: record.name })
            }
        }
    }

    /// Attach to a session, blocking until detach; bumps `last_accessed`.
    pub async fn attach(
        &self,
        repo_dir: &Path,
        branch: Option<&str>,
        session: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AttachTarget, EngineError> {
        let target = self.resolve_attach(repo_dir, branch, session, cancel).await?;
        let entry = self.entry_for_branch(repo_dir, &target.branch, cancel).await?;
        let record = entry
            .session_by_name(&target.session)
            .ok_or(EngineError::NoSession { scope: None })?;
        self.mux.attach_session(&record.mux_session)?;
        self.touch_session(&entry, &target.session, cancel).await?;
        Ok(target)
    }

    /// Kill one session and forget it: mux session, catalog row, log file.
    pub async fn kill_session(
        &self,
        repo_dir: &Path,
        branch: &str,
        session: &str,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let mut entry = self.entry_for_branch(repo_dir, branch, cancel).await?;
        let record = entry.session_by_name(session).cloned().ok_or_else(|| {
            EngineError::NoSession { scope: Some(format!("'{}/{}'", branch, session)) }
        })?;

        match self.mux.kill_session(&record.mux_session, cancel).await {
            Ok(()) | Err(MuxError::SessionNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        entry.sessions.retain(|s| s.id != record.id);
        self.catalog.update(entry.clone(), cancel).await?;
        if let Err(e) = self.logs.remove_session_log(&entry.id, &record.id) {
            tracing::warn!(error = %e, "failed to remove session log");
        }
        Ok(())
    }

    /// Run a one-off command through the runtime without a mux session
    /// (the `exec --no-mux` path). Non-interactive output is teed to the
    /// session log layout under a fresh session id.
    pub async fn exec_direct(
        &self,
        repo_dir: &Path,
        branch: &str,
        cmd: Vec<String>,
        interactive: bool,
        cancel: &CancellationToken,
    ) -> Result<i32, EngineError> {
        let entry = self.entry_for_branch(repo_dir, branch, cancel).await?;
        let entry = self.resume_if_stopped(entry, cancel).await?;
        let runtime = self.runtime_for(&entry)?;

        let cfg = hjk_runtime::ExecConfig {
            cmd: if cmd.is_empty() { vec![self.settings.shell.clone()] } else { cmd },
            workdir: Some(
                entry.remote_workdir.clone().unwrap_or_else(|| "/workspace".to_string()),
            ),
            user: entry.remote_user.clone(),
            env: Vec::new(),
            interactive,
        };
        let out = runtime.exec(&entry.container_id, &cfg, cancel).await?;
        if !interactive {
            use std::io::Write;
            let record = SessionRecord::new(&entry.id, "exec", SessionKind::Shell);
            let log_path = self.logs.ensure_session_log(&entry.id, &record.id)?;
            let mut writers = hjk_storage::SessionWriters::create(
                &log_path,
                Some(Box::new(std::io::stdout())),
                Some(Box::new(std::io::stderr())),
            )?;
            writers.stdout.write_all(&out.stdout)?;
            writers.stderr.write_all(&out.stderr)?;
            writers.sync()?;
        }
        Ok(out.code)
    }

    async fn touch_session(
        &self,
        entry: &Instance,
        session: &str,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        // Re-read inside the update so a concurrent mutation isn't lost.
        let mut fresh = self.catalog.get(&entry.id, cancel).await?;
        if let Some(record) = fresh.session_by_name_mut(session) {
            record.touch();
            self.catalog.update(fresh, cancel).await?;
        }
        Ok(())
    }

    /// The shell command a session runs on the host side: runtime exec
    /// tokens + container id + an in-container `sh -lc` script carrying
    /// env exports, the credential setup preamble, and the command.
    fn in_container_command(
        &self,
        entry: &Instance,
        env: &SessionEnv,
        command: &str,
    ) -> String {
        let runtime_tokens = self
            .runtime_for(entry)
            .map(|r| r.exec_command())
            .unwrap_or_else(|_| vec!["docker".into(), "exec".into(), "-it".into()]);

        let mut script = String::new();
        for (k, v) in &env.vars {
            script.push_str(&format!("export {}={} && ", k, sh_quote(v)));
        }
        if let Some(setup) = &env.setup {
            script.push_str(setup);
            script.push_str(" && ");
        }
        if let Some(workdir) = entry.remote_workdir.as_deref() {
            script.push_str(&format!("cd {} && ", sh_quote(workdir)));
        } else {
            script.push_str("cd /workspace && ");
        }
        script.push_str(command);

        let mut argv = runtime_tokens;
        if let Some(user) = entry.remote_user.as_deref() {
            // Vanilla runtimes accept -u between exec flags and the id;
            // the devcontainer CLI resolves the remote user itself.
            if argv.first().map(String::as_str) != Some("devcontainer") {
                argv.push("-u".to_string());
                argv.push(user.to_string());
            }
        }
        argv.push(entry.container_id.clone());
        argv.push("sh".to_string());
        argv.push("-lc".to_string());
        argv.push(script);
        sh_join(argv.iter().map(String::as_str))
    }

    fn session_command(&self, spec: &SessionSpec) -> Result<String, EngineError> {
        if let Some(command) = &spec.command_override {
            return Ok(command.clone());
        }
        let base = match spec.kind.agent() {
            None => self.settings.shell.clone(),
            Some(agent) => self.settings.agent_command(agent),
        };
        Ok(match &spec.prompt {
            Some(prompt) => format!("{} {}", base, sh_quote(prompt)),
            None => base,
        })
    }

    fn session_env(
        &self,
        _entry: &Instance,
        spec: &SessionSpec,
    ) -> Result<SessionEnv, EngineError> {
        let mut vars: Vec<(String, String)> = Vec::new();
        let mut setup = None;
        if let Some(agent) = spec.kind.agent() {
            let credential = self.creds.load(agent)?;
            let injection = injection_for(agent, &credential)?;
            vars.extend(injection.env);
            setup = injection.setup;
        }
        vars.extend(spec.env_extra.iter().cloned());
        Ok(SessionEnv { vars, setup })
    }
}

struct SessionEnv {
    vars: Vec<(String, String)>,
    setup: Option<String>,
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
