use std::sync::LazyLock;

use regex::Regex;

/// Compiled credential patterns, initialized once.
static SECRET_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // GitHub tokens: ghp_, gho_, ghs_, ghu_, github_pat_
        (
            Regex::new(r"\b(gh[opsu]_[a-zA-Z0-9]{20,}|github_pat_[a-zA-Z0-9_]{22,})").unwrap(),
            "[REDACTED_GITHUB_TOKEN]",
        ),
        // Sentry org and user auth tokens
        (
            Regex::new(r"\b(sntry[su]_[a-zA-Z0-9+/=_-]{20,})").unwrap(),
            "[REDACTED_SENTRY_TOKEN]",
        ),
        // Bearer tokens echoed back from an Authorization header
        (
            Regex::new(r"(?i)(Bearer\s+)[a-zA-Z0-9._\-]{20,}").unwrap(),
            "${1}[REDACTED_BEARER]",
        ),
    ]
});

/// Replace known credential shapes with `[REDACTED_*]` placeholders.
///
/// Applied to upstream error bodies and transport messages before they reach
/// the calling agent.
pub fn redact_secrets(input: &str) -> String {
    let mut output = input.to_string();
    for (pat, replacement) in SECRET_PATTERNS.iter() {
        output = pat.replace_all(&output, *replacement).to_string();
    }
    output
}

/// Maximum characters of an upstream error body kept in an error message.
pub const MAX_ERROR_BODY_LEN: usize = 200;

/// Truncate an upstream error body and strip credentials from it.
pub fn sanitize_error_body(body: &str) -> String {
    let body = body.trim();
    let truncated = match body.char_indices().nth(MAX_ERROR_BODY_LEN) {
        Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
        None => body.to_string(),
    };
    redact_secrets(&truncated)
}
