use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::{
    IssueDetail, IssueEvent, IssueSummary, NewPullRequest, PullRequest, RepoContext, RepoFile,
};
use crate::window::ContextWindow;

/// Read-only access to the error tracker.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Unresolved issues seen within the last `hours_ago` hours.
    async fn list_issues(
        &self,
        hours_ago: u32,
        limit: u32,
    ) -> Result<Vec<IssueSummary>, SourceError>;

    async fn get_issue(&self, issue_id: &str) -> Result<IssueDetail, SourceError>;

    /// Events of one issue, most recent first.
    async fn list_issue_events(
        &self,
        issue_id: &str,
        limit: u32,
    ) -> Result<Vec<IssueEvent>, SourceError>;
}

/// The version-controlled repository the crashing code lives in.
///
/// `get_file` must report an absent path as [`SourceError::NotFound`]; path
/// resolution depends on it to tell a wrong guess from a broken upstream.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Ref used when a call does not name one.
    fn default_ref(&self) -> &str;

    /// Browser link to `path` at `git_ref`, anchored at `line` if given.
    fn permalink(&self, git_ref: &str, path: &str, line: Option<u32>) -> Option<String>;

    async fn get_file(&self, path: &str, git_ref: Option<&str>) -> Result<RepoFile, SourceError>;

    async fn get_context(
        &self,
        path: &str,
        line: u32,
        radius: u32,
        git_ref: Option<&str>,
    ) -> Result<RepoContext, SourceError> {
        let file = self.get_file(path, git_ref).await?;
        let window = ContextWindow::extract(&file.text, line, radius);
        let permalink = self.permalink(&file.git_ref, &file.path, Some(window.line));
        Ok(window.into_repo_context(&file, permalink))
    }

    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequest, SourceError>;
}
