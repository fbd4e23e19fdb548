//! In-memory collaborators for tests. They record every call so tests can
//! assert which paths were fetched and in what order.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Service, SourceError};
use crate::source::{IssueSource, SourceRepository};
use crate::types::{IssueDetail, IssueEvent, IssueSummary, NewPullRequest, PullRequest, RepoFile};

/// Issues and events held in memory.
#[derive(Default)]
pub struct InMemoryIssues {
    issues: Vec<IssueDetail>,
    events: HashMap<String, Vec<IssueEvent>>,
}

impl InMemoryIssues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(mut self, issue: IssueDetail) -> Self {
        self.issues.push(issue);
        self
    }

    /// Append an event; events are returned in insertion order.
    pub fn with_event(mut self, issue_id: &str, event: IssueEvent) -> Self {
        self.events
            .entry(issue_id.to_string())
            .or_default()
            .push(event);
        self
    }
}

#[async_trait]
impl IssueSource for InMemoryIssues {
    async fn list_issues(
        &self,
        _hours_ago: u32,
        limit: u32,
    ) -> Result<Vec<IssueSummary>, SourceError> {
        Ok(self
            .issues
            .iter()
            .take(limit as usize)
            .map(|i| i.summary.clone())
            .collect())
    }

    async fn get_issue(&self, issue_id: &str) -> Result<IssueDetail, SourceError> {
        self.issues
            .iter()
            .find(|i| i.summary.id == issue_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                service: Service::Sentry,
                resource: format!("issue {issue_id}"),
            })
    }

    async fn list_issue_events(
        &self,
        issue_id: &str,
        limit: u32,
    ) -> Result<Vec<IssueEvent>, SourceError> {
        Ok(self
            .events
            .get(issue_id)
            .map(|evs| evs.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}

/// Files keyed by path, plus per-path injected failures.
pub struct InMemoryRepository {
    default_ref: String,
    files: HashMap<String, String>,
    failures: HashMap<String, SourceError>,
    fetched: Mutex<Vec<String>>,
    opened: Mutex<Vec<NewPullRequest>>,
}

impl InMemoryRepository {
    pub fn new(default_ref: &str) -> Self {
        Self {
            default_ref: default_ref.to_string(),
            files: HashMap::new(),
            failures: HashMap::new(),
            fetched: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn with_file(mut self, path: &str, text: &str) -> Self {
        self.files.insert(path.to_string(), text.to_string());
        self
    }

    /// Make fetching `path` fail with `error`.
    pub fn with_failure(mut self, path: &str, error: SourceError) -> Self {
        self.failures.insert(path.to_string(), error);
        self
    }

    /// Every path passed to `get_file`, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<NewPullRequest> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceRepository for InMemoryRepository {
    fn default_ref(&self) -> &str {
        &self.default_ref
    }

    fn permalink(&self, git_ref: &str, path: &str, line: Option<u32>) -> Option<String> {
        let base = format!("https://github.test/acme/web/blob/{git_ref}/{path}");
        Some(match line {
            Some(n) => format!("{base}#L{n}"),
            None => base,
        })
    }

    async fn get_file(&self, path: &str, git_ref: Option<&str>) -> Result<RepoFile, SourceError> {
        self.fetched.lock().unwrap().push(path.to_string());
        if let Some(err) = self.failures.get(path) {
            return Err(err.clone());
        }
        let git_ref = git_ref.unwrap_or(&self.default_ref);
        match self.files.get(path) {
            Some(text) => Ok(RepoFile {
                path: path.to_string(),
                git_ref: git_ref.to_string(),
                text: text.clone(),
                permalink: self.permalink(git_ref, path, None),
            }),
            None => Err(SourceError::NotFound {
                service: Service::Github,
                resource: path.to_string(),
            }),
        }
    }

    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequest, SourceError> {
        let mut opened = self.opened.lock().unwrap();
        opened.push(pr.clone());
        let number = opened.len() as u64;
        Ok(PullRequest {
            url: format!("https://github.test/acme/web/pull/{number}"),
            number,
            title: pr.title.clone(),
        })
    }
}
