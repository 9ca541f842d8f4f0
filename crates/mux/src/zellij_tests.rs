use super::*;
use hjk_exec::FakeExecutor;

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

fn zellij() -> (Zellij, FakeExecutor) {
    let fake = FakeExecutor::new();
    (Zellij::new(Arc::new(fake.clone())), fake)
}

#[tokio::test]
async fn detached_create_is_not_supported() {
    let (z, fake) = zellij();
    let err = z.create_session(&CreateSession::default(), &cancel()).await.unwrap_err();
    assert!(matches!(err, MuxError::DetachedModeNotSupported("zellij")));
    // And nothing was spawned
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn list_sessions_parses_names() {
    let (z, fake) = zellij();
    fake.on_ok("zellij", ["list-sessions"], "hjk-a-b\nmain\n");
    assert_eq!(z.list_sessions(&cancel()).await.unwrap(), vec!["hjk-a-b", "main"]);

    fake.on_fail("zellij", ["list-sessions"], 1, "No active zellij sessions found.");
    assert!(z.list_sessions(&cancel()).await.unwrap().is_empty());
}

#[tokio::test]
async fn kill_missing_session_is_not_found() {
    let (z, fake) = zellij();
    fake.on_fail("zellij", ["kill-session"], 1, "session not found");
    assert!(matches!(
        z.kill_session("nope", &cancel()).await,
        Err(MuxError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn attach_runs_interactively() {
    let (z, fake) = zellij();
    z.attach_session("hjk-a-b").unwrap();
    let call = fake.calls().remove(0);
    assert!(call.interactive);
    assert_eq!(call.args, vec!["attach", "hjk-a-b"]);
}
