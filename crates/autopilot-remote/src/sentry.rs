use async_trait::async_trait;
use autopilot_core::config::SentryConfig;
use autopilot_core::{IssueDetail, IssueEvent, IssueSource, IssueSummary, Service, SourceError};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use url::Url;

use crate::http;

/// Read-only Sentry API client scoped to one organization and project.
pub struct SentryClient {
    http: reqwest::Client,
    base_url: Url,
    org_slug: String,
    project_slug: String,
}

impl SentryClient {
    pub fn new(config: &SentryConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: http::client(Service::Sentry, &config.auth_token, HeaderMap::new())?,
            base_url: config.base_url.clone(),
            org_slug: config.org_slug.clone(),
            project_slug: config.project_slug.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T, SourceError> {
        let url = http::endpoint(&self.base_url, segments, true);
        tracing::debug!(%url, "sentry request");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| http::transport(Service::Sentry, e))?;
        http::read_json(Service::Sentry, resource, response).await
    }
}

#[async_trait]
impl IssueSource for SentryClient {
    async fn list_issues(
        &self,
        hours_ago: u32,
        limit: u32,
    ) -> Result<Vec<IssueSummary>, SourceError> {
        let issues: Vec<IssueSummary> = self
            .get_json(
                &["projects", &self.org_slug, &self.project_slug, "issues"],
                &[
                    ("query", format!("is:unresolved lastSeen:-{hours_ago}h")),
                    ("per_page", limit.to_string()),
                ],
                "issues",
            )
            .await?;
        tracing::debug!(count = issues.len(), hours_ago, "listed sentry issues");
        Ok(issues)
    }

    async fn get_issue(&self, issue_id: &str) -> Result<IssueDetail, SourceError> {
        self.get_json(&["issues", issue_id], &[], &format!("issue {issue_id}"))
            .await
    }

    async fn list_issue_events(
        &self,
        issue_id: &str,
        limit: u32,
    ) -> Result<Vec<IssueEvent>, SourceError> {
        self.get_json(
            &["issues", issue_id, "events"],
            &[("per_page", limit.to_string()), ("full", "true".into())],
            &format!("events of issue {issue_id}"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config(server: &MockServer) -> SentryConfig {
        SentryConfig {
            base_url: Url::parse(&server.url("/api/0")).unwrap(),
            auth_token: "sntrys_test".into(),
            org_slug: "acme".into(),
            project_slug: "web".into(),
        }
    }

    #[tokio::test]
    async fn list_issues_sends_query_and_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/0/projects/acme/web/issues/")
                    .query_param("query", "is:unresolved lastSeen:-6h")
                    .query_param("per_page", "5")
                    .header("authorization", "Bearer sntrys_test");
                then.status(200).json_body(json!([
                    { "id": "1", "shortId": "WEB-1", "title": "TypeError", "count": "12",
                      "metadata": { "filename": "/src/a.ts" } },
                    { "id": "2", "title": null }
                ]));
            })
            .await;

        let client = SentryClient::new(&config(&server)).unwrap();
        let issues = client.list_issues(6, 5).await.unwrap();
        mock.assert_async().await;
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].short_id, "WEB-1");
        assert_eq!(issues[0].event_count, 12);
        assert_eq!(issues[0].metadata.source_file(), Some("/src/a.ts"));
        assert_eq!(issues[1].title, "");
    }

    #[tokio::test]
    async fn events_request_full_payloads() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/0/issues/42/events/")
                    .query_param("full", "true")
                    .query_param("per_page", "3");
                then.status(200).json_body(json!([{
                    "id": "abc",
                    "eventID": "0f6c2d1e",
                    "entries": [{ "type": "exception", "data": { "values": [{
                        "stacktrace": { "frames": [{ "filename": "src/a.ts", "lineno": 4 }] }
                    }] } }]
                }]));
            })
            .await;

        let client = SentryClient::new(&config(&server)).unwrap();
        let events = client.list_issue_events("42", 3).await.unwrap();
        mock.assert_async().await;
        assert_eq!(events[0].id, "abc");
        assert_eq!(events[0].event_id.as_deref(), Some("0f6c2d1e"));
        assert_eq!(events[0].entries.len(), 1);
    }

    #[tokio::test]
    async fn missing_issue_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/0/issues/9/");
                then.status(404).body(r#"{"detail":"The requested resource does not exist"}"#);
            })
            .await;

        let client = SentryClient::new(&config(&server)).unwrap();
        let err = client.get_issue("9").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Sentry resource not found: issue 9");
    }

    #[tokio::test]
    async fn upstream_failure_keeps_status_and_reason() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/0/issues/9/");
                then.status(401);
            })
            .await;

        let client = SentryClient::new(&config(&server)).unwrap();
        let err = client.get_issue("9").await.unwrap_err();
        assert_eq!(err.to_string(), "Sentry API failed: 401 Unauthorized");
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/0/issues/9/");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let client = SentryClient::new(&config(&server)).unwrap();
        let err = client.get_issue("9").await.unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
        assert!(!err.is_not_found());
    }
}
