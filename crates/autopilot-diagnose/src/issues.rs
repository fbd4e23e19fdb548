use autopilot_core::IssueSummary;
use serde::Serialize;

const TITLE_LIMIT: usize = 80;
const TITLE_KEEP: usize = 77;

/// One line of the unresolved-issue listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRow {
    pub id: String,
    pub short_id: String,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
    pub event_count: u64,
    pub summary: String,
    pub permalink: Option<String>,
    pub level: Option<String>,
    pub status: Option<String>,
}

impl From<&IssueSummary> for IssueRow {
    fn from(issue: &IssueSummary) -> Self {
        Self {
            id: issue.id.clone(),
            short_id: issue.short_id.clone(),
            first_seen: issue.first_seen.clone(),
            last_seen: issue.last_seen.clone(),
            event_count: issue.event_count,
            summary: summary_line(issue),
            permalink: issue.permalink.clone(),
            level: issue.level.clone(),
            status: issue.status.clone(),
        }
    }
}

/// `"<shortId> — <title> — <file>"`, dropping the file part when the issue
/// names none.
pub fn summary_line(issue: &IssueSummary) -> String {
    let short_id = if issue.short_id.is_empty() {
        &issue.id
    } else {
        &issue.short_id
    };
    let title = clip_title(&issue.title);
    let file = issue
        .metadata
        .filename
        .as_deref()
        .unwrap_or("")
        .trim_start_matches('/');

    if file.is_empty() {
        format!("{short_id} — {title}")
    } else {
        format!("{short_id} — {title} — {file}")
    }
}

fn clip_title(title: &str) -> String {
    let title = title.trim();
    if title.chars().count() > TITLE_LIMIT {
        let kept: String = title.chars().take(TITLE_KEEP).collect();
        format!("{kept}…")
    } else {
        title.to_string()
    }
}
