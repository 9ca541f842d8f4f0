use super::*;
use crate::settings::Settings;
use crate::test_helpers::*;
use hjk_core::{AgentKind, Instance};
use hjk_creds::{Credential, CredentialKind};
use hjk_mux::MuxKind;
use hjk_storage::ListFilter;

async fn provisioned(f: &Fixture, branch: &str) -> Instance {
    script_repo(&f.fake, &f.repo_dir());
    script_worktree_create(&f.fake);
    script_container_run(&f.fake, "c0ffee");
    script_tmux(&f.fake);
    script_container_state(&f.fake, "c0ffee", "running");
    f.mgr.ensure_instance(&f.repo_dir(), branch, None, &cancel()).await.unwrap()
}

fn detached(kind: hjk_core::SessionKind) -> SessionSpec {
    SessionSpec { detached: true, ..SessionSpec::agent(kind) }
}

#[tokio::test]
async fn shell_session_runs_through_runtime_exec_inside_tmux() {
    let f = fixture();
    let entry = provisioned(&f, "feat/auth").await;

    let (entry, record) =
        f.mgr.create_session_in(entry, detached(hjk_core::SessionKind::Shell), &cancel()).await.unwrap();

    assert_eq!(record.kind, hjk_core::SessionKind::Shell);
    assert_eq!(record.mux_session, format!("hjk-{}-{}", entry.id, record.id));
    // Auto-generated docker-style name
    assert!(record.name.contains('_'), "name: {}", record.name);

    let create = f
        .fake
        .calls_to("tmux")
        .into_iter()
        .find(|c| c.args.first().map(String::as_str) == Some("new-session"))
        .unwrap();
    // Detached, named, rooted in the worktree
    assert_eq!(create.args[1], "-d");
    assert_eq!(create.args[3], record.mux_session);
    let child = create.args.last().unwrap().clone();
    assert!(child.starts_with("docker exec -it c0ffee sh -lc "), "child: {child}");
    assert!(child.contains("cd /workspace"), "child: {child}");
    assert!(child.contains("bash"), "child: {child}");

    // Output piped to the session's log file
    let pipe = f
        .fake
        .calls_to("tmux")
        .into_iter()
        .find(|c| c.args.first().map(String::as_str) == Some("pipe-pane"))
        .unwrap();
    let log_path = f.mgr.logs().session_log(&entry.id, &record.id);
    assert!(pipe.args[4].contains(&log_path.display().to_string()));
    assert!(log_path.parent().unwrap().is_dir());

    // Catalog carries the session
    let stored = f.mgr.catalog.get(&entry.id, &cancel()).await.unwrap();
    assert_eq!(stored.sessions.len(), 1);
    assert_eq!(stored.sessions[0].name, record.name);
}

#[tokio::test]
async fn agent_session_injects_credentials_and_setup() {
    let f = fixture();
    let entry = provisioned(&f, "feat/auth").await;

    f.mgr
        .creds()
        .save(
            AgentKind::Claude,
            &Credential { kind: CredentialKind::Subscription, value: "sk-ant-oat01-x".into() },
        )
        .unwrap();

    let mut spec = detached(hjk_core::SessionKind::Claude);
    spec.prompt = Some("fix the auth bug".into());
    let (_entry, record) = f.mgr.create_session_in(entry, spec, &cancel()).await.unwrap();
    assert_eq!(record.kind, hjk_core::SessionKind::Claude);

    let create = f
        .fake
        .calls_to("tmux")
        .into_iter()
        .find(|c| c.args.first().map(String::as_str) == Some("new-session"))
        .unwrap();
    let child = create.args.last().unwrap().clone();
    assert!(child.contains("CLAUDE_CODE_OAUTH_TOKEN"), "child: {child}");
    assert!(child.contains("hasCompletedOnboarding"), "child: {child}");
    assert!(child.contains("claude"), "child: {child}");
    // Prompt is quoted into the agent command
    assert!(child.contains("fix the auth bug"), "child: {child}");
}

#[tokio::test]
async fn agent_session_without_credentials_is_auth_required() {
    let f = fixture();
    let entry = provisioned(&f, "main").await;
    let err = f
        .mgr
        .create_session_in(entry, detached(hjk_core::SessionKind::Gemini), &cancel())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Cred(hjk_creds::CredError::AuthRequired(AgentKind::Gemini))
    ));
}

#[tokio::test]
async fn second_session_appends_to_the_same_instance() {
    let f = fixture();
    let entry = provisioned(&f, "main").await;
    let (entry, first) = f
        .mgr
        .create_session_in(entry, detached(hjk_core::SessionKind::Shell), &cancel())
        .await
        .unwrap();
    let (entry, second) = f
        .mgr
        .create_session_in(entry, detached(hjk_core::SessionKind::Shell), &cancel())
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_ne!(first.name, second.name);
    let stored = f.mgr.catalog.get(&entry.id, &cancel()).await.unwrap();
    assert_eq!(stored.sessions.len(), 2);

    let all = f.mgr.catalog.list(ListFilter::default(), &cancel()).await.unwrap();
    assert_eq!(all.len(), 1, "no second instance for the same branch");
}

#[tokio::test]
async fn explicit_duplicate_name_is_rejected() {
    let f = fixture();
    let entry = provisioned(&f, "main").await;
    let mut spec = detached(hjk_core::SessionKind::Shell);
    spec.name = Some("debug-shell".into());
    let (entry, _) = f.mgr.create_session_in(entry, spec.clone(), &cancel()).await.unwrap();

    let err = f.mgr.create_session_in(entry, spec, &cancel()).await.unwrap_err();
    assert!(matches!(err, EngineError::SessionNameTaken(name) if name == "debug-shell"));
}

#[tokio::test]
async fn kill_session_removes_exactly_one() {
    let f = fixture();
    let entry = provisioned(&f, "feat/auth").await;

    let mut spec = detached(hjk_core::SessionKind::Shell);
    spec.name = Some("happy-panda".into());
    let (entry, _) = f.mgr.create_session_in(entry, spec, &cancel()).await.unwrap();
    let mut spec = detached(hjk_core::SessionKind::Shell);
    spec.name = Some("debug-shell".into());
    let (entry, debug) = f.mgr.create_session_in(entry, spec, &cancel()).await.unwrap();

    // Seed a log file so the kill has something to clean up
    let log = f.mgr.logs().ensure_session_log(&entry.id, &debug.id).unwrap();
    std::fs::write(&log, "bye\n").unwrap();

    f.mgr.kill_session(&f.repo_dir(), "feat/auth", "debug-shell", &cancel()).await.unwrap();

    let stored = f.mgr.catalog.get(&entry.id, &cancel()).await.unwrap();
    let names: Vec<&str> = stored.sessions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["happy-panda"]);
    assert!(!log.exists());

    let kills: Vec<_> = f
        .fake
        .calls_to("tmux")
        .into_iter()
        .filter(|c| c.args.first().map(String::as_str) == Some("kill-session"))
        .collect();
    assert_eq!(kills.len(), 1);
    assert_eq!(kills[0].args[2], debug.mux_session);

    // Killing it again reports the missing session
    let err =
        f.mgr.kill_session(&f.repo_dir(), "feat/auth", "debug-shell", &cancel()).await.unwrap_err();
    assert!(matches!(err, EngineError::NoSession { .. }));
}

#[tokio::test]
async fn attach_resolution_follows_mru() {
    let f = fixture();
    let entry = provisioned(&f, "feat/auth").await;

    let mut spec = detached(hjk_core::SessionKind::Shell);
    spec.name = Some("s1".into());
    let (entry, s1) = f.mgr.create_session_in(entry, spec, &cancel()).await.unwrap();
    let mut spec = detached(hjk_core::SessionKind::Shell);
    spec.name = Some("s2".into());
    let (_entry, s2) = f.mgr.create_session_in(entry, spec, &cancel()).await.unwrap();

    script_tmux_sessions(&f.fake, &[&s1.mux_session, &s2.mux_session]);

    // Attach to s1: it becomes the most recent
    let target =
        f.mgr.attach(&f.repo_dir(), Some("feat/auth"), Some("s1"), &cancel()).await.unwrap();
    assert_eq!(target.session, "s1");

    // Branch-scoped MRU now resolves to s1
    let target = f.mgr.resolve_attach(&f.repo_dir(), Some("feat/auth"), None, &cancel()).await.unwrap();
    assert_eq!(target.session, "s1");

    // Global MRU resolves to the same
    let target = f.mgr.resolve_attach(&f.repo_dir(), None, None, &cancel()).await.unwrap();
    assert_eq!(target, AttachTarget { branch: "feat/auth".into(), session: "s1".into() });
}

#[tokio::test]
async fn attach_with_empty_scope_is_no_session() {
    let f = fixture();
    script_tmux(&f.fake);
    let err = f.mgr.resolve_attach(&f.repo_dir(), None, None, &cancel()).await.unwrap_err();
    assert!(matches!(err, EngineError::NoSession { .. }));
    assert!(err.hint().is_some());
}

#[tokio::test]
async fn attach_prunes_sessions_the_mux_lost() {
    let f = fixture();
    let entry = provisioned(&f, "main").await;
    let mut spec = detached(hjk_core::SessionKind::Shell);
    spec.name = Some("gone".into());
    let (entry, _) = f.mgr.create_session_in(entry, spec, &cancel()).await.unwrap();

    // The mux lost the session: resolution treats the scope as empty
    script_tmux_sessions(&f.fake, &[]);
    let err = f
        .mgr
        .resolve_attach(&f.repo_dir(), Some("main"), None, &cancel())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoSession { .. }));

    let stored = f.mgr.catalog.get(&entry.id, &cancel()).await.unwrap();
    assert!(stored.sessions.is_empty(), "catalog row was reconciled away");
}

#[tokio::test]
async fn zellij_detached_create_surfaces_the_condition() {
    let settings = Settings { mux: MuxKind::Zellij, ..Settings::default() };
    let f = fixture_with(settings);
    let entry = provisioned(&f, "main").await;

    let err = f
        .mgr
        .create_session_in(entry, detached(hjk_core::SessionKind::Shell), &cancel())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Mux(hjk_mux::MuxError::DetachedModeNotSupported("zellij"))
    ));
    assert!(err.hint().unwrap().contains("tmux"));
}

#[tokio::test]
async fn exec_direct_tees_output_to_a_log() {
    let f = fixture();
    let _entry = provisioned(&f, "main").await;
    f.fake.on_ok("docker", ["exec"], "hello from container\n");

    let code = f
        .mgr
        .exec_direct(&f.repo_dir(), "main", vec!["echo".into(), "hi".into()], false, &cancel())
        .await
        .unwrap();
    assert_eq!(code, 0);

    // A log file exists under the instance's log dir with the output
    let entries = f.mgr.catalog.list(ListFilter::default(), &cancel()).await.unwrap();
    let entry = &entries[0];
    let logs = f.mgr.logs().list_session_logs(&entry.id).unwrap();
    assert_eq!(logs.len(), 1);
    let content = std::fs::read_to_string(
        f.mgr.logs().session_log(&entry.id, &logs[0]),
    )
    .unwrap();
    assert_eq!(content, "hello from container\n");
}

#[tokio::test]
async fn command_override_wins_over_agent_defaults() {
    let f = fixture();
    let entry = provisioned(&f, "main").await;
    let mut spec = detached(hjk_core::SessionKind::Shell);
    spec.command_override = Some("htop".into());
    f.mgr.create_session_in(entry, spec, &cancel()).await.unwrap();

    let create = f
        .fake
        .calls_to("tmux")
        .into_iter()
        .find(|c| c.args.first().map(String::as_str) == Some("new-session"))
        .unwrap();
    let child = create.args.last().unwrap();
    assert!(child.ends_with("htop'"), "child: {child}");
}
