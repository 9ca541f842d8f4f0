//! Workspace-level CLI specs: exercise the `hjk` binary end-to-end for
//! the verbs that don't need a container runtime or a multiplexer on the
//! test machine. State and config are pinned to a temp dir per test.

use assert_cmd::Command;
use tempfile::TempDir;

struct Env {
    _tmp: TempDir,
    state: std::path::PathBuf,
    config: std::path::PathBuf,
}

fn env() -> Env {
    let tmp = TempDir::new().expect("tempdir");
    let state = tmp.path().join("state");
    let config = tmp.path().join("config.toml");
    Env { state, config, _tmp: tmp }
}

// `hjk` lives in a different workspace member (crates/cli) than this
// integration test's own package, so Cargo doesn't set `CARGO_BIN_EXE_hjk`
// for us (that env var is only populated for bin targets of the package
// owning the test). Fall back to locating the binary next to this test
// executable in the target profile directory (requires `cargo test
// --workspace` so the `hjk` bin is actually built).
fn hjk_bin_path() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_hjk") {
        return path.into();
    }
    let mut path = std::env::current_exe().expect("current test exe");
    path.pop(); // deps
    path.pop(); // profile dir (e.g. debug)
    path.push("hjk");
    path
}

fn hjk(env: &Env) -> Command {
    let mut cmd = Command::new(hjk_bin_path());
    cmd.env("HEADJACK_STATE_DIR", &env.state)
        .env("HEADJACK_CONFIG", &env.config)
        .env_remove("HEADJACK_DEFAULT_AGENT")
        .env_remove("HEADJACK_BASE_IMAGE")
        .env_remove("HEADJACK_WORKTREE_DIR");
    cmd
}

#[test]
fn version_prints_the_crate_version() {
    let env = env();
    let assert = hjk(&env).arg("version").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.starts_with("hjk "), "stdout: {stdout}");
}

#[test]
fn help_lists_the_verbs() {
    let env = env();
    let assert = hjk(&env).arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    for verb in ["run", "agent", "exec", "attach", "ps", "logs", "kill", "stop", "rm", "recreate", "auth", "config"] {
        assert!(stdout.contains(verb), "help missing {verb}: {stdout}");
    }
}

#[test]
fn no_arguments_is_a_usage_error() {
    let env = env();
    hjk(&env).assert().failure();
}

#[test]
fn ps_with_empty_state_reports_no_instances() {
    let env = env();
    let assert = hjk(&env).args(["ps", "-a"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("No instances"), "stdout: {stdout}");
}

#[test]
fn ls_alias_matches_ps() {
    let env = env();
    let assert = hjk(&env).args(["ls", "-a"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("No instances"));
}

#[test]
fn ps_json_with_empty_state_is_an_empty_array() {
    let env = env();
    let assert = hjk(&env).args(["ps", "-a", "--json"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(parsed, serde_json::json!([]));
}

#[test]
fn attach_with_no_sessions_fails_with_a_hint() {
    let env = env();
    let assert = hjk(&env).arg("attach").assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("no session"), "stderr: {stderr}");
    assert!(stderr.contains("hjk run"), "stderr: {stderr}");
}

#[test]
fn kill_requires_branch_slash_session() {
    let env = env();
    let assert = hjk(&env).args(["kill", "just-a-branch"]).assert().failure().code(2);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("<branch>/<session>"), "stderr: {stderr}");
}

#[test]
fn auth_rejects_unknown_agents() {
    let env = env();
    let assert = hjk(&env).args(["auth", "copilot"]).assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("unknown agent"), "stderr: {stderr}");
    assert!(stderr.contains("claude, gemini, codex"), "stderr: {stderr}");
}

#[test]
fn config_set_then_get_round_trips() {
    let env = env();
    hjk(&env).args(["config", "runtime", "podman"]).assert().success();
    let assert = hjk(&env).args(["config", "runtime"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert_eq!(stdout.trim(), "podman");

    // The written file is valid TOML the loader accepts
    let raw = std::fs::read_to_string(&env.config).expect("config written");
    assert!(raw.contains("runtime"));
}

#[test]
fn config_rejects_invalid_runtime_values() {
    let env = env();
    let assert = hjk(&env).args(["config", "runtime", "vmware"]).assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("invalid config"), "stderr: {stderr}");
    assert!(!env.config.exists());
}

#[test]
fn config_dump_without_a_file_mentions_defaults() {
    let env = env();
    let assert = hjk(&env).arg("config").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("defaults"), "stdout: {stdout}");
}

#[test]
fn nested_config_keys_round_trip() {
    let env = env();
    hjk(&env).args(["config", "agents.claude.command", "claude --verbose"]).assert().success();
    let assert = hjk(&env).args(["config", "agents.claude.command"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert_eq!(stdout.trim(), "claude --verbose");
}
