use std::sync::LazyLock;

use autopilot_core::{IssueSource, Location, SourceError, SourceRepository};
use regex::{NoExpand, Regex};
use serde::Serialize;

use crate::diagnose::diagnose_issue;

// ── Fix proposal ──

pub const DEFAULT_FIX_RADIUS: u32 = 80;

const FIX_SUMMARY: &str = "Guard against missing window.userAnalytics before calling track().";
const CRASH_LINE: &str =
    r#"            (window as any).userAnalytics.track("logo_clicked", { time: Date.now() });"#;
const GUARD_DECL: &str = "const ua = (window as any).userAnalytics;";
const GUARD_CALL: &str = r#"if (ua?.track) ua.track("logo_clicked", { time: Date.now() });"#;

/// A patch suggestion for one issue. Nothing is written anywhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FixProposal {
    #[serde(rename_all = "camelCase")]
    Unavailable {
        issue_id: String,
        file_path: String,
        summary: String,
        diff: String,
        error: String,
        tried_paths: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Proposed {
        issue_id: String,
        file_path: String,
        summary: String,
        diff: String,
        location: Location,
        context: Option<String>,
        file_preview: Option<String>,
    },
}

/// Unified diff guarding the `userAnalytics.track` call in `file_path`.
pub fn guard_diff(file_path: &str) -> String {
    [
        format!("diff --git a/{file_path} b/{file_path}"),
        format!("--- a/{file_path}"),
        format!("+++ b/{file_path}"),
        "@@".to_string(),
        format!("-{CRASH_LINE}"),
        format!("+            {GUARD_DECL}"),
        format!("+            {GUARD_CALL}"),
    ]
    .join("\n")
}

/// Diagnose `issue_id` and attach the guard patch for its crash site.
pub async fn propose_fix(
    issues: &dyn IssueSource,
    repo: &dyn SourceRepository,
    issue_id: &str,
    radius: u32,
    git_ref: Option<&str>,
) -> Result<FixProposal, SourceError> {
    let diagnosis = diagnose_issue(issues, repo, issue_id, radius, git_ref).await?;

    if diagnosis.location.path.is_empty() {
        return Ok(FixProposal::Unavailable {
            issue_id: issue_id.to_string(),
            file_path: String::new(),
            summary: "Unable to propose fix".to_string(),
            diff: String::new(),
            error: diagnosis
                .error
                .unwrap_or_else(|| "No file path found.".to_string()),
            tried_paths: diagnosis.tried_paths.unwrap_or_default(),
        });
    }

    let file_path = diagnosis.location.path.clone();
    Ok(FixProposal::Proposed {
        issue_id: issue_id.to_string(),
        diff: guard_diff(&file_path),
        file_path,
        summary: FIX_SUMMARY.to_string(),
        location: diagnosis.location,
        context: diagnosis.context,
        file_preview: diagnosis.file_preview,
    })
}

// ── Mock apply ──

/// Characters kept on each side of the change in a preview.
const PREVIEW_RADIUS: usize = 400;

const NOTE: &str = "No GitHub write performed. This only validates and previews the change.";

static CRASH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(\(window as any\)\.userAnalytics)\.track\(\s*["']logo_clicked["']\s*,\s*\{\s*time:\s*Date\.now\(\)\s*\}\s*\)\s*;?"#,
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApplyStrategy {
    /// Replace one literal occurrence of `before` with `after`.
    Exact,
    /// Rewrite the one known unguarded `userAnalytics.track` call.
    #[default]
    Regex,
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("'before' snippet must not be empty")]
    EmptySnippet,
    #[error("'before' snippet not found in {path}")]
    SnippetNotFound { path: String },
    #[error("'before' matched {count} times in {path} (make it more specific).")]
    SnippetAmbiguous { path: String, count: usize },
    #[error("regex did not match in {path}")]
    PatternNotFound { path: String },
    #[error("regex matched {count} times in {path}")]
    PatternAmbiguous { path: String, count: usize },
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub issue_id: String,
    pub file_path: String,
    pub base_ref: String,
    pub branch_name: Option<String>,
    pub commit_message: String,
    pub before: String,
    pub after: String,
    pub strategy: ApplyStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum MatchInfo {
    Exact { occurrences: usize },
    Regex { matches: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub before: String,
    pub after: String,
}

/// What applying the change would produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyPreview {
    pub ok: bool,
    pub mode: &'static str,
    pub match_info: MatchInfo,
    pub issue_id: String,
    pub file_path: String,
    pub base_ref: String,
    pub branch_name: String,
    pub commit_message: String,
    pub note: &'static str,
    pub preview: Preview,
}

/// The rewritten text plus the anchors used to excerpt it.
struct Rewrite {
    updated: String,
    match_info: MatchInfo,
    before_anchor: String,
    after_anchor: String,
}

fn rewrite(text: &str, path: &str, req: &ApplyRequest) -> Result<Rewrite, ApplyError> {
    match req.strategy {
        ApplyStrategy::Exact => {
            if req.before.is_empty() {
                return Err(ApplyError::EmptySnippet);
            }
            let count = text.matches(req.before.as_str()).count();
            match count {
                0 => Err(ApplyError::SnippetNotFound { path: path.into() }),
                1 => Ok(Rewrite {
                    updated: text.replacen(req.before.as_str(), &req.after, 1),
                    match_info: MatchInfo::Exact { occurrences: 1 },
                    before_anchor: req.before.clone(),
                    after_anchor: req.after.clone(),
                }),
                n => Err(ApplyError::SnippetAmbiguous {
                    path: path.into(),
                    count: n,
                }),
            }
        }
        ApplyStrategy::Regex => {
            let count = CRASH_PATTERN.find_iter(text).count();
            match count {
                0 => Err(ApplyError::PatternNotFound { path: path.into() }),
                1 => {
                    let replacement = format!("{GUARD_DECL}\n            {GUARD_CALL}");
                    Ok(Rewrite {
                        updated: CRASH_PATTERN
                            .replace(text, NoExpand(&replacement))
                            .into_owned(),
                        match_info: MatchInfo::Regex { matches: 1 },
                        before_anchor: "userAnalytics.track".into(),
                        after_anchor: GUARD_DECL.into(),
                    })
                }
                n => Err(ApplyError::PatternAmbiguous {
                    path: path.into(),
                    count: n,
                }),
            }
        }
    }
}

/// Up to `PREVIEW_RADIUS` characters either side of the first `anchor`, or
/// the head of the text when the anchor is absent.
fn excerpt(text: &str, anchor: &str) -> String {
    match text.find(anchor) {
        Some(idx) => {
            let at = text[..idx].chars().count();
            let start = at.saturating_sub(PREVIEW_RADIUS);
            text.chars()
                .skip(start)
                .take(at + PREVIEW_RADIUS - start)
                .collect()
        }
        None => text.chars().take(2 * PREVIEW_RADIUS).collect(),
    }
}

/// Validate that the change applies cleanly to `file_path` at `base_ref` and
/// preview it. The repository is only read.
pub async fn mock_apply(
    repo: &dyn SourceRepository,
    req: &ApplyRequest,
) -> Result<ApplyPreview, ApplyError> {
    let file = repo.get_file(&req.file_path, Some(&req.base_ref)).await?;
    let change = rewrite(&file.text, &req.file_path, req)?;
    tracing::info!(
        issue_id = %req.issue_id,
        file_path = %req.file_path,
        match_info = ?change.match_info,
        "mock apply validated"
    );

    Ok(ApplyPreview {
        ok: true,
        mode: "mock",
        preview: Preview {
            before: excerpt(&file.text, &change.before_anchor),
            after: excerpt(&change.updated, &change.after_anchor),
        },
        match_info: change.match_info,
        issue_id: req.issue_id.clone(),
        file_path: req.file_path.clone(),
        base_ref: req.base_ref.clone(),
        branch_name: req
            .branch_name
            .clone()
            .unwrap_or_else(|| format!("fix/sentry-{}-MOCK", req.issue_id)),
        commit_message: req.commit_message.clone(),
        note: NOTE,
    })
}
