use autopilot_core::frame::pick_best_frame;
use autopilot_core::path::normalize_path;
use autopilot_core::window::ContextWindow;
use autopilot_core::{
    DiagnosisResult, IssueRef, IssueSource, Location, SourceError, SourceRepository,
};

use crate::resolve::{resolve_file, Resolution};

pub const DEFAULT_RADIUS: u32 = 12;
pub const MAX_RADIUS: u32 = 200;

/// Characters of the resolved file returned when the crash line is unknown.
pub const PREVIEW_CHARS: usize = 2000;

const NO_PATH: &str = "No file path found in issue/event.";
const FILE_MISSING: &str = "File not found in repository for extracted path.";

/// Locate the crash site of an issue and render the code around it.
///
/// The path comes from the latest event's best frame, falling back to the
/// issue metadata. Only a failure other than not-found is returned as `Err`;
/// a missing path or an unresolvable file is reported inside the result.
pub async fn diagnose_issue(
    issues: &dyn IssueSource,
    repo: &dyn SourceRepository,
    issue_id: &str,
    radius: u32,
    git_ref: Option<&str>,
) -> Result<DiagnosisResult, SourceError> {
    let issue = issues.get_issue(issue_id).await?;
    let events = issues.list_issue_events(issue_id, 1).await?;
    let issue_ref = IssueRef::from(&issue);

    let mut path = normalize_path(issue.summary.metadata.source_file().unwrap_or("")).to_string();
    let mut line = None;
    let mut frame_context = None;

    if let Some(event) = events.first() {
        let picked = pick_best_frame(event);
        if !picked.is_empty() {
            path = picked.path;
        }
        if picked.line.is_some() {
            line = picked.line;
        }
        if picked.inline_context.is_some() {
            frame_context = picked.inline_context;
        }
    }
    tracing::debug!(issue_id, %path, ?line, "extracted crash site");

    if path.is_empty() {
        return Ok(DiagnosisResult {
            issue: issue_ref,
            error: Some(NO_PATH.to_string()),
            ..Default::default()
        });
    }

    let (resolved, file) = match resolve_file(repo, &path, git_ref).await? {
        Resolution::Found { path, file, .. } => (path, file),
        Resolution::Missing { tried, last_error } => {
            let error = format!("{FILE_MISSING} {}", last_error.unwrap_or_default());
            return Ok(DiagnosisResult {
                issue: issue_ref,
                location: Location {
                    path,
                    line,
                    permalink: None,
                },
                context: frame_context,
                tried_paths: Some(tried),
                error: Some(error.trim_end().to_string()),
                ..Default::default()
            });
        }
    };

    let Some(line) = line else {
        return Ok(DiagnosisResult {
            issue: issue_ref,
            location: Location {
                path: resolved,
                line: None,
                permalink: None,
            },
            file_preview: Some(file.text.chars().take(PREVIEW_CHARS).collect()),
            ..Default::default()
        });
    };

    let window = ContextWindow::extract(&file.text, line, radius);
    let permalink = repo.permalink(&file.git_ref, &resolved, Some(window.line));
    Ok(DiagnosisResult {
        issue: issue_ref,
        location: Location {
            path: resolved,
            line: Some(window.line),
            permalink,
        },
        context: Some(window.rendered),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_core::testing::{InMemoryIssues, InMemoryRepository};
    use autopilot_core::{IssueDetail, IssueEvent, Service};
    use serde_json::json;

    fn issue(metadata: serde_json::Value) -> IssueDetail {
        serde_json::from_value(json!({
            "id": "42",
            "shortId": "WEB-42",
            "title": "TypeError: Cannot read properties of undefined (reading 'track')",
            "culprit": "Nav",
            "metadata": metadata
        }))
        .unwrap()
    }

    fn webpack_event() -> IssueEvent {
        serde_json::from_value(json!({
            "id": "e1",
            "entries": [{ "type": "exception", "data": { "values": [{
                "stacktrace": { "frames": [
                    { "filename": "webpack:///./src/a.ts", "lineno": 42, "in_app": true,
                      "context_line": "crash();" }
                ] }
            }] } }]
        }))
        .unwrap()
    }

    fn numbered(n: usize) -> String {
        (1..=n)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn metadata_path_without_frames_returns_preview() {
        let issues = InMemoryIssues::new().with_issue(issue(json!({
            "filename": "app/components/Nav.tsx"
        })));
        let long = "x".repeat(PREVIEW_CHARS + 500);
        let repo = InMemoryRepository::new("main").with_file("src/app/components/Nav.tsx", &long);

        let res = diagnose_issue(&issues, &repo, "42", 12, None).await.unwrap();
        assert_eq!(res.location.path, "src/app/components/Nav.tsx");
        assert_eq!(res.location.line, None);
        assert_eq!(res.file_preview.as_ref().map(|p| p.len()), Some(PREVIEW_CHARS));
        assert_eq!(res.context, None);
        assert_eq!(res.error, None);
        assert_eq!(res.issue.short_id, "WEB-42");
    }

    #[tokio::test]
    async fn webpack_frame_is_windowed_at_its_line() {
        let issues = InMemoryIssues::new()
            .with_issue(issue(json!({})))
            .with_event("42", webpack_event());
        let repo = InMemoryRepository::new("main").with_file("src/a.ts", &numbered(100));

        let res = diagnose_issue(&issues, &repo, "42", 12, None).await.unwrap();
        assert_eq!(repo.fetched(), vec!["src/a.ts"]);
        assert_eq!(res.location.path, "src/a.ts");
        assert_eq!(res.location.line, Some(42));
        assert_eq!(
            res.location.permalink.as_deref(),
            Some("https://github.test/acme/web/blob/main/src/a.ts#L42")
        );
        let ctx = res.context.unwrap();
        let lines: Vec<&str> = ctx.lines().collect();
        assert_eq!(lines.len(), 25);
        assert!(lines[0].contains("  30 | line 30"));
        assert!(lines[24].contains("  54 | line 54"));
        assert_eq!(lines[12], ">   42 | line 42");
        assert!(res.file_preview.is_none());
    }

    #[tokio::test]
    async fn frame_path_overrides_metadata() {
        let issues = InMemoryIssues::new()
            .with_issue(issue(json!({ "filename": "old/place.ts" })))
            .with_event("42", webpack_event());
        let repo = InMemoryRepository::new("main").with_file("src/a.ts", "only line");

        let res = diagnose_issue(&issues, &repo, "42", 12, Some("release")).await.unwrap();
        assert_eq!(res.location.path, "src/a.ts");
        assert_eq!(res.location.line, Some(1));
        assert_eq!(res.context.as_deref(), Some(">    1 | only line"));
    }

    #[tokio::test]
    async fn no_path_signal_is_a_result_not_an_error() {
        let issues = InMemoryIssues::new().with_issue(issue(json!({ "value": "boom" })));
        let repo = InMemoryRepository::new("main");

        let res = diagnose_issue(&issues, &repo, "42", 12, None).await.unwrap();
        assert_eq!(res.location.path, "");
        assert_eq!(res.error.as_deref(), Some(NO_PATH));
        assert!(repo.fetched().is_empty());
    }

    #[tokio::test]
    async fn unresolved_file_keeps_tracker_context_and_attempts() {
        let issues = InMemoryIssues::new()
            .with_issue(issue(json!({})))
            .with_event("42", webpack_event());
        let repo = InMemoryRepository::new("main");

        let res = diagnose_issue(&issues, &repo, "42", 12, None).await.unwrap();
        assert_eq!(res.location.path, "src/a.ts");
        assert_eq!(res.location.line, Some(42));
        assert_eq!(res.context.as_deref(), Some("crash();"));
        assert_eq!(res.tried_paths.as_ref().map(Vec::len), Some(6));
        let error = res.error.unwrap();
        assert!(error.starts_with(FILE_MISSING));
        assert!(error.ends_with("packages/web/src/a.ts"));
    }

    #[tokio::test]
    async fn upstream_failure_fails_the_whole_diagnosis() {
        let issues = InMemoryIssues::new()
            .with_issue(issue(json!({})))
            .with_event("42", webpack_event());
        let repo = InMemoryRepository::new("main").with_failure(
            "src/a.ts",
            SourceError::Status {
                service: Service::Github,
                status: 401,
                body: "Bad credentials".into(),
            },
        );

        let err = diagnose_issue(&issues, &repo, "42", 12, None).await.unwrap_err();
        assert_eq!(err.to_string(), "GitHub API failed: 401 Bad credentials");
    }

    #[tokio::test]
    async fn unknown_issue_propagates_not_found() {
        let issues = InMemoryIssues::new();
        let repo = InMemoryRepository::new("main");
        let err = diagnose_issue(&issues, &repo, "404", 12, None).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
