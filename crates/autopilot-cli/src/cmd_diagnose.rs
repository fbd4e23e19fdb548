use autopilot_core::config::Config;
use autopilot_diagnose::diagnose_issue;
use autopilot_remote::{GithubClient, SentryClient};

pub fn execute(
    config: &Config,
    issue_id: &str,
    radius: u32,
    git_ref: Option<&str>,
) -> anyhow::Result<()> {
    let issues = SentryClient::new(&config.sentry)?;
    let repo = GithubClient::new(&config.github)?;

    let result = tokio::runtime::Runtime::new()?
        .block_on(diagnose_issue(&issues, &repo, issue_id, radius, git_ref))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if let Some(error) = &result.error {
        tracing::warn!(issue_id, "{error}");
    }
    Ok(())
}
