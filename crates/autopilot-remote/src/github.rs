use async_trait::async_trait;
use autopilot_core::config::GithubConfig;
use autopilot_core::{NewPullRequest, PullRequest, RepoFile, Service, SourceError, SourceRepository};
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::http;

const API_VERSION: &str = "2022-11-28";

/// GitHub REST client bound to one repository.
pub struct GithubClient {
    http: reqwest::Client,
    api_url: Url,
    web_url: Url,
    owner: String,
    repo: String,
    default_ref: String,
}

#[derive(Deserialize)]
struct ContentResponse {
    path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Serialize)]
struct CreatePullRequest<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
    draft: bool,
}

#[derive(Deserialize)]
struct CreatedPullRequest {
    html_url: String,
    number: u64,
    title: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        Ok(Self {
            http: http::client(Service::Github, &config.token, headers)?,
            api_url: config.api_url.clone(),
            web_url: config.web_url.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            default_ref: config.default_ref.clone(),
        })
    }

    fn repo_endpoint<'a>(&'a self, tail: impl IntoIterator<Item = &'a str>) -> Url {
        let segments: Vec<&str> = ["repos", self.owner.as_str(), self.repo.as_str()]
            .into_iter()
            .chain(tail)
            .collect();
        http::endpoint(&self.api_url, &segments, false)
    }
}

/// Decode a contents-API payload. GitHub wraps base64 at 60 columns.
fn decode_content(path: &str, data: &ContentResponse) -> Result<String, SourceError> {
    let decode_error = |message: String| SourceError::Decode {
        service: Service::Github,
        resource: path.to_string(),
        message,
    };
    let content = match (data.content.as_deref(), data.encoding.as_deref()) {
        (Some(content), Some("base64")) => content,
        (_, encoding) => {
            return Err(decode_error(format!(
                "expected base64 file content, got encoding {}",
                encoding.unwrap_or("none")
            )))
        }
    };
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| decode_error(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl SourceRepository for GithubClient {
    fn default_ref(&self) -> &str {
        &self.default_ref
    }

    fn permalink(&self, git_ref: &str, path: &str, line: Option<u32>) -> Option<String> {
        let segments: Vec<&str> = [self.owner.as_str(), self.repo.as_str(), "blob", git_ref]
            .into_iter()
            .chain(path.trim_start_matches('/').split('/'))
            .collect();
        let mut url = http::endpoint(&self.web_url, &segments, false);
        if let Some(n) = line {
            url.set_fragment(Some(&format!("L{n}")));
        }
        Some(url.into())
    }

    async fn get_file(&self, path: &str, git_ref: Option<&str>) -> Result<RepoFile, SourceError> {
        let path = path.trim_start_matches('/');
        let git_ref = git_ref.unwrap_or(&self.default_ref);
        let url = self.repo_endpoint(std::iter::once("contents").chain(path.split('/')));
        tracing::debug!(%url, git_ref, "github contents request");

        let response = self
            .http
            .get(url)
            .query(&[("ref", git_ref)])
            .send()
            .await
            .map_err(|e| http::transport(Service::Github, e))?;
        let data: ContentResponse = http::read_json(Service::Github, path, response).await?;
        let text = decode_content(path, &data)?;

        Ok(RepoFile {
            permalink: self.permalink(git_ref, &data.path, None),
            path: data.path,
            git_ref: git_ref.to_string(),
            text,
        })
    }

    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<PullRequest, SourceError> {
        let base = pr.base.as_deref().unwrap_or(&self.default_ref);
        let body = CreatePullRequest {
            title: &pr.title,
            head: &pr.head,
            base,
            body: &pr.body,
            draft: pr.draft,
        };
        tracing::info!(head = %pr.head, base, draft = pr.draft, "opening pull request");

        let response = self
            .http
            .post(self.repo_endpoint(["pulls"]))
            .json(&body)
            .send()
            .await
            .map_err(|e| http::transport(Service::Github, e))?;
        let created: CreatedPullRequest =
            http::read_json(Service::Github, "pulls", response).await?;
        Ok(PullRequest {
            url: created.html_url,
            number: created.number,
            title: created.title,
        })
    }
}
