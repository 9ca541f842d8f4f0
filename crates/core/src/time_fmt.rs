//! Compact elapsed-time formatting for table output.

/// Format a duration in seconds as a compact age: "5s", "2m", "1h", "3d".
pub fn format_elapsed(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Relative age of a UTC timestamp, e.g. "2m" for two minutes ago.
pub fn format_time_ago(at: chrono::DateTime<chrono::Utc>) -> String {
    let elapsed = chrono::Utc::now().signed_duration_since(at).num_seconds().max(0) as u64;
    format_elapsed(elapsed)
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
