//! `hjk config [key [value]] [--edit]`: read and write the TOML config.
//!
//! Keys use dotted paths (`runtime`, `agents.claude.command`,
//! `runtime_flags.memory`). Values are parsed as booleans or integers
//! when they look like one, strings otherwise.

use std::path::Path;

use hjk_engine::{Settings, StatePaths};
use hjk_exec::{Executor, SystemExecutor};

use crate::exit_error::ExitError;

pub fn handle(key: Option<String>, value: Option<String>, edit: bool) -> Result<(), ExitError> {
    let path = StatePaths::config_file();

    if edit {
        return open_editor(&path);
    }
    match (key, value) {
        (None, _) => show_all(&path),
        (Some(key), None) => show_key(&path, &key),
        (Some(key), Some(value)) => set_key(&path, &key, &value),
    }
}

fn load_table(path: &Path) -> Result<toml::value::Table, ExitError> {
    if !path.is_file() {
        return Ok(toml::value::Table::new());
    }
    let raw = std::fs::read_to_string(path)?;
    toml::from_str(&raw).map_err(|e| ExitError::new(1, format!("invalid config: {e}")))
}

fn show_all(path: &Path) -> Result<(), ExitError> {
    // Validate on the way through so a broken file surfaces here, not on
    // the next `hjk run`.
    Settings::load(path).map_err(|e| ExitError::new(1, e.to_string()))?;
    if path.is_file() {
        print!("{}", std::fs::read_to_string(path)?);
    } else {
        println!("# no config at {} (defaults in effect)", path.display());
    }
    Ok(())
}

fn show_key(path: &Path, key: &str) -> Result<(), ExitError> {
    let table = load_table(path)?;
    let mut cursor = &toml::Value::Table(table);
    for part in key.split('.') {
        cursor = cursor
            .get(part)
            .ok_or_else(|| ExitError::new(1, format!("config key '{}' is not set", key)))?;
    }
    match cursor {
        toml::Value::String(s) => println!("{}", s),
        other => println!("{}", other),
    }
    Ok(())
}

fn set_key(path: &Path, key: &str, value: &str) -> Result<(), ExitError> {
    let mut table = load_table(path)?;

    let parsed = parse_value(value);
    let mut cursor = &mut table;
    let parts: Vec<&str> = key.split('.').collect();
    for part in &parts[..parts.len() - 1] {
        let next = cursor
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        cursor = next.as_table_mut().ok_or_else(|| {
            ExitError::new(1, format!("config key '{}' crosses a non-table value", key))
        })?;
    }
    let leaf = parts[parts.len() - 1];
    cursor.insert(leaf.to_string(), parsed);

    // Reject writes that would leave an unloadable config
    let rendered = toml::to_string_pretty(&table)
        .map_err(|e| ExitError::new(1, e.to_string()))?;
    toml::from_str::<Settings>(&rendered)
        .map_err(|e| ExitError::new(1, format!("refusing to write invalid config: {e}")))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, rendered)?;
    println!("{} = {}", key, value);
    Ok(())
}

fn parse_value(value: &str) -> toml::Value {
    if let Ok(b) = value.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    if let Ok(i) = value.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    toml::Value::String(value.to_string())
}

fn open_editor(path: &Path) -> Result<(), ExitError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let exec = SystemExecutor::new();
    let code = exec
        .run_interactive(&editor, &[path.display().to_string()])
        .map_err(|e| ExitError::new(1, e.to_string()))?;
    if code != 0 {
        return Err(ExitError::new(code, format!("{} exited with code {}", editor, code)));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
