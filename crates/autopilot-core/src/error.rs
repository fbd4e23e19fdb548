use std::fmt;

/// The remote collaborator an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Sentry,
    Github,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Sentry => f.write_str("Sentry"),
            Service::Github => f.write_str("GitHub"),
        }
    }
}

/// Failure talking to a remote collaborator.
///
/// `NotFound` is the only recoverable kind: path resolution moves on to the next
/// candidate when it sees one. Every other variant is an upstream failure and
/// aborts the current request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("{service} resource not found: {resource}")]
    NotFound { service: Service, resource: String },

    #[error("{service} API failed: {status} {body}")]
    Status {
        service: Service,
        status: u16,
        body: String,
    },

    #[error("{service} request failed: {message}")]
    Transport { service: Service, message: String },

    #[error("unexpected {service} response for {resource}: {message}")]
    Decode {
        service: Service,
        resource: String,
        message: String,
    },
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }

    pub fn service(&self) -> Service {
        match self {
            SourceError::NotFound { service, .. }
            | SourceError::Status { service, .. }
            | SourceError::Transport { service, .. }
            | SourceError::Decode { service, .. } => *service,
        }
    }
}
