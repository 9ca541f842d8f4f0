//! Branch-name sanitizing for filesystem paths.

/// Turn a branch name into a path-safe directory component.
///
/// `/` becomes `-`; characters outside `[A-Za-z0-9_-]` are stripped;
/// leading and trailing `-` are trimmed. `feat/auth` sanitizes to
/// `feat-auth`.
pub fn sanitize_branch(branch: &str) -> String {
    let mapped: String = branch
        .chars()
        .map(|c| if c == '/' { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    mapped.trim_matches('-').to_string()
}

#[cfg(test)]
#[path = "branch_tests.rs"]
mod tests;
