//! Table rendering for `hjk ps`.

use hjk_core::format_time_ago;
use hjk_engine::InstanceView;

/// Render instances as an aligned text table.
pub fn render_ps_table(views: &[InstanceView]) -> String {
    if views.is_empty() {
        return "No instances".to_string();
    }

    let branch_width = views
        .iter()
        .map(|v| v.instance.branch.len())
        .max()
        .unwrap_or(0)
        .max("BRANCH".len());
    let repo_width = views
        .iter()
        .map(|v| v.instance.repo_id.len())
        .max()
        .unwrap_or(0)
        .max("REPO".len());
    let status_width = views
        .iter()
        .map(|v| v.instance.status.to_string().len())
        .max()
        .unwrap_or(0)
        .max("STATUS".len());

    let mut out = format!(
        "{:<branch_width$}  {:<repo_width$}  {:<status_width$}  {:<8}  {:<8}  SESSIONS\n",
        "BRANCH", "REPO", "STATUS", "ID", "CREATED",
    );
    for v in views {
        let sessions = if v.instance.sessions.is_empty() {
            "-".to_string()
        } else {
            v.instance
                .sessions
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };
        out.push_str(&format!(
            "{:<branch_width$}  {:<repo_width$}  {:<status_width$}  {:<8}  {:<8}  {}\n",
            v.instance.branch,
            v.instance.repo_id,
            v.instance.status.to_string(),
            v.instance.id.as_str(),
            format_time_ago(v.instance.created_at),
            sessions,
        ));
    }
    out.pop();
    out
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
