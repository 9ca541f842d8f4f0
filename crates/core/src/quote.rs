//! POSIX shell quoting.
//!
//! Every path or argument embedded in a composed shell command (log piping,
//! devcontainer exec with a workdir, agent prompts) goes through here.

/// Quote a string for safe interpolation into a POSIX shell command.
///
/// Plain words pass through untouched; anything else is single-quoted with
/// embedded single quotes escaped as `'\''`.
pub fn sh_quote(s: &str) -> String {
    if !s.is_empty() && s.chars().all(is_safe_char) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Quote and join a full argv into one shell command line.
pub fn sh_join<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter().map(|a| sh_quote(a.as_ref())).collect::<Vec<_>>().join(" ")
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | '@' | '%' | '+')
}

#[cfg(test)]
#[path = "quote_tests.rs"]
mod tests;
