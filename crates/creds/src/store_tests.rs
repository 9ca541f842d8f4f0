use super::*;
use tempfile::TempDir;

#[test]
fn file_store_round_trips_and_is_private() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state").join("secrets.json");
    let store = FileSecretStore::new(&path);

    assert!(store.get("headjack-claude").unwrap().is_none());
    store.set("headjack-claude", "{\"type\":\"apikey\",\"value\":\"sk-ant-api-x\"}").unwrap();
    assert!(store.get("headjack-claude").unwrap().unwrap().contains("sk-ant-api-x"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600, "secrets file mode {:o}", mode);
    }

    store.delete("headjack-claude").unwrap();
    assert!(store.get("headjack-claude").unwrap().is_none());
    // Deleting a missing account is fine
    store.delete("headjack-claude").unwrap();
}

#[test]
fn credential_store_types_the_json() {
    let store = CredentialStore::new(Box::new(MemorySecretStore::default()));
    let agent = hjk_core::AgentKind::Codex;

    assert!(matches!(store.load(agent), Err(CredError::AuthRequired(_))));

    let cred = Credential { kind: CredentialKind::ApiKey, value: "sk-123".into() };
    store.save(agent, &cred).unwrap();
    assert_eq!(store.load(agent).unwrap(), cred);

    store.forget(agent).unwrap();
    assert!(matches!(store.load(agent), Err(CredError::AuthRequired(_))));
}

#[test]
fn credential_wire_format_uses_type_field() {
    let cred = Credential { kind: CredentialKind::Subscription, value: "sk-ant-abc".into() };
    let json = serde_json::to_string(&cred).unwrap();
    assert_eq!(json, r#"{"type":"subscription","value":"sk-ant-abc"}"#);
}

#[test]
fn accounts_are_namespaced_per_agent() {
    let backend = Box::new(MemorySecretStore::default());
    let store = CredentialStore::new(backend);
    let cred = Credential { kind: CredentialKind::ApiKey, value: "AIzaXYZ".into() };
    store.save(hjk_core::AgentKind::Gemini, &cred).unwrap();
    assert!(matches!(
        store.load(hjk_core::AgentKind::Claude),
        Err(CredError::AuthRequired(_))
    ));
}
