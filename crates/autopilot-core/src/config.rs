use url::Url;

pub const DEFAULT_SENTRY_BASE_URL: &str = "https://sentry.io/api/0";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_WEB_URL: &str = "https://github.com";
pub const DEFAULT_GITHUB_REF: &str = "main";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL in {key}: {value:?} ({reason})")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub base_url: Url,
    pub auth_token: String,
    pub org_slug: String,
    pub project_slug: String,
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_url: Url,
    /// Host used for permalinks (`<web>/<owner>/<repo>/blob/...`).
    pub web_url: Url,
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub default_ref: String,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub sentry: SentryConfig,
    pub github: GithubConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Values are trimmed; empty values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let url = |key: &'static str, default: &str| -> Result<Url, ConfigError> {
            parse_http_url(key, get(key).as_deref().unwrap_or(default))
        };

        Ok(Self {
            sentry: SentryConfig {
                base_url: url("SENTRY_BASE_URL", DEFAULT_SENTRY_BASE_URL)?,
                auth_token: get("SENTRY_AUTH_TOKEN").unwrap_or_default(),
                org_slug: get("SENTRY_ORG_SLUG").unwrap_or_default(),
                project_slug: get("SENTRY_PROJECT_SLUG").unwrap_or_default(),
            },
            github: GithubConfig {
                api_url: url("GITHUB_BASE_URL", DEFAULT_GITHUB_API_URL)?,
                web_url: url("GITHUB_WEB_URL", DEFAULT_GITHUB_WEB_URL)?,
                token: get("GITHUB_TOKEN").unwrap_or_default(),
                owner: get("GITHUB_OWNER").unwrap_or_default(),
                repo: get("GITHUB_REPO").unwrap_or_default(),
                default_ref: get("GITHUB_REF").unwrap_or_else(|| DEFAULT_GITHUB_REF.to_string()),
            },
        })
    }

    /// Settings that are missing but not fatal. The server still starts; calls
    /// that need them fail upstream.
    pub fn warnings(&self) -> Vec<String> {
        let checks = [
            ("SENTRY_AUTH_TOKEN", self.sentry.auth_token.is_empty()),
            ("SENTRY_ORG_SLUG", self.sentry.org_slug.is_empty()),
            ("SENTRY_PROJECT_SLUG", self.sentry.project_slug.is_empty()),
            ("GITHUB_TOKEN", self.github.token.is_empty()),
            ("GITHUB_OWNER", self.github.owner.is_empty()),
            ("GITHUB_REPO", self.github.repo.is_empty()),
        ];
        checks
            .into_iter()
            .filter(|(_, missing)| *missing)
            .map(|(key, _)| format!("{key} is not set"))
            .collect()
    }

    /// `KEY = value` lines with credentials masked.
    pub fn redacted_lines(&self) -> Vec<String> {
        vec![
            format!("SENTRY_BASE_URL = {}", self.sentry.base_url),
            format!("SENTRY_AUTH_TOKEN = {}", mask(&self.sentry.auth_token)),
            format!("SENTRY_ORG_SLUG = {}", self.sentry.org_slug),
            format!("SENTRY_PROJECT_SLUG = {}", self.sentry.project_slug),
            format!("GITHUB_BASE_URL = {}", self.github.api_url),
            format!("GITHUB_WEB_URL = {}", self.github.web_url),
            format!("GITHUB_TOKEN = {}", mask(&self.github.token)),
            format!("GITHUB_OWNER = {}", self.github.owner),
            format!("GITHUB_REPO = {}", self.github.repo),
            format!("GITHUB_REF = {}", self.github.default_ref),
        ]
    }
}

fn parse_http_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(not set)"
    } else {
        "********"
    }
}
