use super::*;
use tempfile::TempDir;

#[test]
fn parse_value_guesses_types() {
    assert_eq!(parse_value("true"), toml::Value::Boolean(true));
    assert_eq!(parse_value("4"), toml::Value::Integer(4));
    assert_eq!(parse_value("podman"), toml::Value::String("podman".into()));
    assert_eq!(parse_value("4g"), toml::Value::String("4g".into()));
}

#[test]
fn set_then_show_round_trips_nested_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    set_key(&path, "runtime", "podman").unwrap();
    set_key(&path, "agents.claude.command", "claude --verbose").unwrap();
    set_key(&path, "runtime_flags.memory", "4g").unwrap();

    let table = load_table(&path).unwrap();
    assert_eq!(table["runtime"].as_str(), Some("podman"));
    assert_eq!(
        table["agents"]["claude"]["command"].as_str(),
        Some("claude --verbose")
    );
    assert_eq!(table["runtime_flags"]["memory"].as_str(), Some("4g"));

    show_key(&path, "runtime").unwrap();
    assert!(show_key(&path, "missing.key").is_err());
}

#[test]
fn set_rejects_values_that_break_the_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    // `runtime` must be docker|podman|apple
    let err = set_key(&path, "runtime", "vmware").unwrap_err();
    assert!(err.message.contains("invalid config"), "msg: {}", err.message);
    assert!(!path.exists(), "invalid config must not be written");
}

#[test]
fn set_rejects_crossing_a_scalar() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    set_key(&path, "base_image", "x:1").unwrap();
    let err = set_key(&path, "base_image.nested", "y").unwrap_err();
    assert!(err.message.contains("non-table"));
}
