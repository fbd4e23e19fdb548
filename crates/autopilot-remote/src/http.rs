use autopilot_core::{Service, SourceError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::redact::{redact_secrets, sanitize_error_body};

const AGENT: &str = concat!("sentry-autopilot/", env!("CARGO_PKG_VERSION"));

/// Build a client carrying the shared headers and an optional bearer token.
pub(crate) fn client(
    service: Service,
    token: &str,
    extra: HeaderMap,
) -> Result<reqwest::Client, SourceError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.extend(extra);
    if !token.is_empty() {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            SourceError::Transport {
                service,
                message: "auth token contains characters not allowed in a header".into(),
            }
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
    }
    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| transport(service, e))
}

/// `base` with `segments` appended, each percent-encoded as one path segment.
pub(crate) fn endpoint<S: AsRef<str>>(base: &Url, segments: &[S], trailing_slash: bool) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
        if trailing_slash {
            path.push("");
        }
    }
    url
}

pub(crate) fn transport(service: Service, err: reqwest::Error) -> SourceError {
    SourceError::Transport {
        service,
        message: redact_secrets(&err.without_url().to_string()),
    }
}

/// Classify the response and decode a successful JSON body.
///
/// 404 maps to [`SourceError::NotFound`] for `resource`; any other non-2xx
/// status keeps a truncated, redacted copy of the body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: Service,
    resource: &str,
    response: Response,
) -> Result<T, SourceError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound {
            service,
            resource: resource.to_string(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body = match sanitize_error_body(&body) {
            b if b.is_empty() => status.canonical_reason().unwrap_or_default().to_string(),
            b => b,
        };
        return Err(SourceError::Status {
            service,
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await.map_err(|e| transport(service, e))?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode {
        service,
        resource: resource.to_string(),
        message: e.to_string(),
    })
}
