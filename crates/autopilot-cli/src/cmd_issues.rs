use autopilot_core::config::Config;
use autopilot_core::IssueSource;
use autopilot_diagnose::IssueRow;
use autopilot_remote::SentryClient;

pub fn execute(config: &Config, hours: u32, limit: u32, json: bool) -> anyhow::Result<()> {
    let client = SentryClient::new(&config.sentry)?;
    let issues = tokio::runtime::Runtime::new()?.block_on(client.list_issues(hours, limit))?;
    let rows: Vec<IssueRow> = issues.iter().map(IssueRow::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", render(&rows, hours));
    }
    Ok(())
}

fn render(rows: &[IssueRow], hours: u32) -> String {
    if rows.is_empty() {
        return format!("No unresolved issues in the last {hours}h.\n");
    }
    let mut out = String::new();
    for row in rows {
        let seen = row.last_seen.as_deref().unwrap_or("-");
        out.push_str(&format!(
            "{}\n    events: {}  last seen: {}\n",
            row.summary, row.event_count, seen
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(summary: &str, count: u64) -> IssueRow {
        IssueRow {
            id: "1".into(),
            short_id: "WEB-1".into(),
            first_seen: None,
            last_seen: Some("2024-05-01T10:00:00Z".into()),
            event_count: count,
            summary: summary.into(),
            permalink: None,
            level: Some("error".into()),
            status: Some("unresolved".into()),
        }
    }

    #[test]
    fn render_lists_summary_and_counts() {
        let out = render(&[row("WEB-1 — Boom — src/a.ts", 4)], 2);
        assert_eq!(
            out,
            "WEB-1 — Boom — src/a.ts\n    events: 4  last seen: 2024-05-01T10:00:00Z\n"
        );
    }

    #[test]
    fn render_empty_mentions_window() {
        assert_eq!(render(&[], 6), "No unresolved issues in the last 6h.\n");
    }
}
