mod http;
pub mod github;
pub mod redact;
pub mod sentry;

pub use github::GithubClient;
pub use sentry::SentryClient;
