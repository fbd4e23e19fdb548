use std::fmt::Display;
use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use autopilot_core::config::Config;
use autopilot_core::{IssueSource, NewPullRequest, SourceRepository};
use autopilot_diagnose::fix::DEFAULT_FIX_RADIUS;
use autopilot_diagnose::{
    diagnose_issue, mock_apply, ApplyError, ApplyRequest, ApplyStrategy, IssueRow,
    DEFAULT_RADIUS, MAX_RADIUS,
};
use autopilot_remote::{GithubClient, SentryClient};

const DEFAULT_HOURS_AGO: u32 = 2;
const DEFAULT_LIMIT: u32 = 20;
const DEFAULT_COMMIT_MESSAGE: &str = "Fix Sentry issue";

// ── Tool parameter structs ──

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ListErrorsParams {
    /// Only issues seen within this many hours (default: 2)
    hours_ago: Option<u32>,
    /// Maximum issues to return (default: 20)
    limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct IssueParams {
    /// Sentry issue ID
    issue_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FileParams {
    /// Repo-relative path, e.g. src/components/X.tsx
    path: String,
    /// Branch, tag or sha (default from GITHUB_REF)
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ContextParams {
    /// Repo-relative path, e.g. src/components/X.tsx
    path: String,
    /// 1-based line number
    line: u32,
    /// Lines above and below, 1 to 200 (default: 12)
    radius: Option<u32>,
    /// Branch, tag or sha (default from GITHUB_REF)
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct DiagnoseParams {
    /// Sentry issue ID
    issue_id: String,
    /// Lines of code around the crash line, 1 to 200
    radius: Option<u32>,
    /// Branch, tag or sha (default from GITHUB_REF)
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum StrategyParam {
    Exact,
    Regex,
}

impl From<StrategyParam> for ApplyStrategy {
    fn from(s: StrategyParam) -> Self {
        match s {
            StrategyParam::Exact => ApplyStrategy::Exact,
            StrategyParam::Regex => ApplyStrategy::Regex,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ApplyFixParams {
    /// Sentry issue ID the fix belongs to
    issue_id: String,
    /// Repo-relative path of the file to patch
    file_path: String,
    /// Ref the file is read from (default from GITHUB_REF)
    base_ref: Option<String>,
    /// Branch the fix would land on (default: fix/sentry-<issueId>-MOCK)
    branch_name: Option<String>,
    /// Commit message the fix would use (default: "Fix Sentry issue")
    commit_message: Option<String>,
    /// Exact text to replace (exact strategy only)
    before: String,
    /// Replacement text (exact strategy only)
    after: String,
    /// "exact" replaces `before` with `after`; "regex" rewrites the known crash pattern (default: regex)
    strategy: Option<StrategyParam>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct OpenPrParams {
    /// Pull request title
    title: String,
    /// Pull request description (default: empty)
    body: Option<String>,
    /// Branch holding the changes
    head: String,
    /// Branch to merge into (default from GITHUB_REF)
    base: Option<String>,
    /// Open as a draft (default: false)
    draft: Option<bool>,
}

// ── MCP Server ──

/// MCP server connecting an error tracker to a source repository.
#[derive(Clone)]
pub struct AutopilotServer {
    issues: Arc<dyn IssueSource>,
    repo: Arc<dyn SourceRepository>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl AutopilotServer {
    pub fn new(issues: Arc<dyn IssueSource>, repo: Arc<dyn SourceRepository>) -> Self {
        Self {
            issues,
            repo,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "list-sentry-errors",
        description = "Get unresolved Sentry issues from the project within a timeframe."
    )]
    async fn list_sentry_errors(
        &self,
        Parameters(params): Parameters<ListErrorsParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "list-sentry-errors";
        let hours_ago = params.hours_ago.unwrap_or(DEFAULT_HOURS_AGO);
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
        tracing::info!(tool = TOOL, hours_ago, limit, "tool invoked");

        let issues = match self.issues.list_issues(hours_ago, limit).await {
            Ok(issues) => issues,
            Err(e) => return Ok(tool_failure(TOOL, e)),
        };
        let rows: Vec<IssueRow> = issues.iter().map(IssueRow::from).collect();
        json_result(&json!({
            "hoursAgo": hours_ago,
            "limit": limit,
            "count": rows.len(),
            "issues": rows,
        }))
    }

    #[tool(name = "get-sentry-error", description = "Get detailed Sentry issue data by ID.")]
    async fn get_sentry_error(
        &self,
        Parameters(params): Parameters<IssueParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "get-sentry-error";
        tracing::info!(tool = TOOL, issue_id = %params.issue_id, "tool invoked");
        match self.issues.get_issue(&params.issue_id).await {
            Ok(issue) => json_result(&issue),
            Err(e) => Ok(tool_failure(TOOL, e)),
        }
    }

    #[tool(
        name = "repo-get-file",
        description = "Fetch a file from the GitHub repository by path and optional ref."
    )]
    async fn repo_get_file(
        &self,
        Parameters(params): Parameters<FileParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "repo-get-file";
        let path = params.path.trim_start_matches('/');
        tracing::info!(tool = TOOL, path, "tool invoked");
        match self.repo.get_file(path, params.git_ref.as_deref()).await {
            Ok(file) => json_result(&file),
            Err(e) => Ok(tool_failure(TOOL, e)),
        }
    }

    #[tool(
        name = "repo-get-context",
        description = "Fetch code context around a specific line in a GitHub file."
    )]
    async fn repo_get_context(
        &self,
        Parameters(params): Parameters<ContextParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "repo-get-context";
        if params.line == 0 {
            return Err(McpError::invalid_params("line must be at least 1", None));
        }
        let radius = check_radius(params.radius, DEFAULT_RADIUS)?;
        let path = params.path.trim_start_matches('/');
        tracing::info!(tool = TOOL, path, line = params.line, radius, "tool invoked");

        match self
            .repo
            .get_context(path, params.line, radius, params.git_ref.as_deref())
            .await
        {
            Ok(ctx) => json_result(&ctx),
            Err(e) => Ok(tool_failure(TOOL, e)),
        }
    }

    #[tool(
        name = "diagnose-sentry-error",
        description = "Fetch a Sentry issue and its latest event, extract the crashing file and line, and fetch the GitHub code around it."
    )]
    async fn diagnose_sentry_error(
        &self,
        Parameters(params): Parameters<DiagnoseParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "diagnose-sentry-error";
        let radius = check_radius(params.radius, DEFAULT_RADIUS)?;
        tracing::info!(tool = TOOL, issue_id = %params.issue_id, radius, "tool invoked");

        match diagnose_issue(
            self.issues.as_ref(),
            self.repo.as_ref(),
            &params.issue_id,
            radius,
            params.git_ref.as_deref(),
        )
        .await
        {
            Ok(result) => json_result(&result),
            Err(e) => Ok(tool_failure(TOOL, e)),
        }
    }

    #[tool(
        name = "propose-fix",
        description = "Draft a minimal safe patch diff for a Sentry issue. Nothing is written."
    )]
    async fn propose_fix(
        &self,
        Parameters(params): Parameters<DiagnoseParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "propose-fix";
        let radius = check_radius(params.radius, DEFAULT_FIX_RADIUS)?;
        tracing::info!(tool = TOOL, issue_id = %params.issue_id, radius, "tool invoked");

        match autopilot_diagnose::propose_fix(
            self.issues.as_ref(),
            self.repo.as_ref(),
            &params.issue_id,
            radius,
            params.git_ref.as_deref(),
        )
        .await
        {
            Ok(proposal) => json_result(&proposal),
            Err(e) => Ok(tool_failure(TOOL, e)),
        }
    }

    #[tool(
        name = "apply-fix",
        description = "MOCK apply: verify the patch applies to the file and preview the result. No branch, no commit, no GitHub writes."
    )]
    async fn apply_fix(
        &self,
        Parameters(params): Parameters<ApplyFixParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "apply-fix";
        let strategy: ApplyStrategy = params.strategy.map(Into::into).unwrap_or_default();
        if strategy == ApplyStrategy::Exact && params.before.is_empty() {
            return Err(McpError::invalid_params(
                "before must not be empty with the exact strategy",
                None,
            ));
        }
        let req = ApplyRequest {
            base_ref: params
                .base_ref
                .unwrap_or_else(|| self.repo.default_ref().to_string()),
            issue_id: params.issue_id,
            file_path: params.file_path.trim_start_matches('/').to_string(),
            branch_name: params.branch_name,
            commit_message: params
                .commit_message
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
            before: params.before,
            after: params.after,
            strategy,
        };
        tracing::info!(tool = TOOL, issue_id = %req.issue_id, file_path = %req.file_path, "tool invoked");

        match mock_apply(self.repo.as_ref(), &req).await {
            Ok(preview) => json_result(&preview),
            Err(ApplyError::Source(e)) => Ok(tool_failure(TOOL, e)),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "MOCK apply failed: {e}"
            ))])),
        }
    }

    #[tool(name = "open-pr", description = "Open a GitHub pull request from a branch.")]
    async fn open_pr(
        &self,
        Parameters(params): Parameters<OpenPrParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "open-pr";
        let pr = NewPullRequest {
            head: params.head,
            base: params.base,
            title: params.title,
            body: params.body.unwrap_or_default(),
            draft: params.draft.unwrap_or(false),
        };
        tracing::info!(tool = TOOL, head = %pr.head, "tool invoked");

        match self.repo.create_pull_request(&pr).await {
            Ok(created) => json_result(&json!({
                "ok": true,
                "prUrl": created.url,
                "number": created.number,
            })),
            Err(e) => Ok(tool_failure(TOOL, e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for AutopilotServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "sentry-autopilot: list Sentry issues, locate the crashing code in GitHub, and draft fixes"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Collaborator failures become a tool error the agent can read.
fn tool_failure(tool: &str, err: impl Display) -> CallToolResult {
    tracing::warn!(tool, error = %err, "tool failed");
    CallToolResult::error(vec![Content::text(format!("{tool} failed: {err}"))])
}

fn check_radius(radius: Option<u32>, default: u32) -> Result<u32, McpError> {
    match radius.unwrap_or(default) {
        r @ 1..=MAX_RADIUS => Ok(r),
        r => Err(McpError::invalid_params(
            format!("radius must be between 1 and {MAX_RADIUS}, got {r}"),
            None,
        )),
    }
}

/// Start the MCP server on stdio transport.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let issues = SentryClient::new(&config.sentry)?;
    let repo = GithubClient::new(&config.github)?;

    let server = AutopilotServer::new(Arc::new(issues), Arc::new(repo));
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}
