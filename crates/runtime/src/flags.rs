//! Flag algebra: fold runtime flags from image labels, user config, and
//! per-call overrides into one deterministic argv.
//!
//! Three layers contribute flags; merges are key-by-key with the override
//! winning, and `to_args` emits a stable, sorted byte sequence so equal
//! inputs always produce equal command lines.

use indexmap::IndexMap;

/// A single flag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Str(String),
    Bool(bool),
    List(Vec<String>),
}

/// Insertion-ordered flag name → value map.
pub type FlagMap = IndexMap<String, FlagValue>;

#[derive(Debug, thiserror::Error)]
pub enum FlagError {
    #[error("flag {key:?} has unsupported type: {detail}")]
    UnsupportedType { key: String, detail: String },
}

/// Read flags from a config table. Strings, booleans, integers (stringified)
/// and all-string arrays are accepted; anything else is an error.
pub fn from_config(table: &toml::value::Table) -> Result<FlagMap, FlagError> {
    let mut map = FlagMap::new();
    for (key, value) in table {
        let flag = match value {
            toml::Value::String(s) => FlagValue::Str(s.clone()),
            toml::Value::Boolean(b) => FlagValue::Bool(*b),
            toml::Value::Integer(i) => FlagValue::Str(i.to_string()),
            toml::Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        toml::Value::String(s) => list.push(s.clone()),
                        other => {
                            return Err(FlagError::UnsupportedType {
                                key: key.clone(),
                                detail: format!("list element {}", other.type_str()),
                            })
                        }
                    }
                }
                FlagValue::List(list)
            }
            other => {
                return Err(FlagError::UnsupportedType {
                    key: key.clone(),
                    detail: other.type_str().to_string(),
                })
            }
        };
        map.insert(key.clone(), flag);
    }
    Ok(map)
}

/// Parse a label-encoded flag string: space-separated `key=value`,
/// `key=true|false` (case-insensitive), or bare `key` tokens. Values may
/// contain `=`; the split happens at the first one. Repeated keys collect
/// into a list preserving order.
pub fn from_label(label: &str) -> FlagMap {
    let mut map = FlagMap::new();
    for token in label.split_whitespace() {
        let (key, value) = match token.split_once('=') {
            Some((key, value)) => {
                let flag = match value.to_ascii_lowercase().as_str() {
                    "true" => FlagValue::Bool(true),
                    "false" => FlagValue::Bool(false),
                    _ => FlagValue::Str(value.to_string()),
                };
                (key, flag)
            }
            None => (token, FlagValue::Bool(true)),
        };
        match map.get_mut(key) {
            None => {
                map.insert(key.to_string(), value);
            }
            Some(existing) => {
                // Repeats become an ordered list; booleans degrade to
                // their literal token text when listed.
                let rendered = |v: &FlagValue| -> Vec<String> {
                    match v {
                        FlagValue::Str(s) => vec![s.clone()],
                        FlagValue::Bool(b) => vec![b.to_string()],
                        FlagValue::List(l) => l.clone(),
                    }
                };
                let mut list = rendered(existing);
                list.extend(rendered(&value));
                *existing = FlagValue::List(list);
            }
        }
    }
    map
}

/// Merge two flag maps key-by-key; `override_map` wins on collision.
/// Types may differ between layers.
pub fn merge(base: &FlagMap, override_map: &FlagMap) -> FlagMap {
    let mut merged = base.clone();
    for (key, value) in override_map {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Emit deterministic CLI arguments: keys sorted, `--key=value` for
/// strings, `--key` for true (false omitted), one `--key=v` per list
/// element in order.
pub fn to_args(map: &FlagMap) -> Vec<String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    let mut args = Vec::new();
    for key in keys {
        match &map[key.as_str()] {
            FlagValue::Str(value) => args.push(format!("--{}={}", key, value)),
            FlagValue::Bool(true) => args.push(format!("--{}", key)),
            FlagValue::Bool(false) => {}
            FlagValue::List(items) => {
                for item in items {
                    args.push(format!("--{}={}", key, item));
                }
            }
        }
    }
    args
}

#[cfg(test)]
#[path = "flags_tests.rs"]
mod tests;
