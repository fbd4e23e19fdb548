use autopilot_core::path::build_path_candidates;
use autopilot_core::{RepoFile, SourceError, SourceRepository};

/// Outcome of probing the repository with every candidate path.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found {
        path: String,
        file: RepoFile,
        /// Candidates probed, ending with `path`.
        tried: Vec<String>,
    },
    Missing {
        tried: Vec<String>,
        /// Message of the last not-found failure, if any candidate was probed.
        last_error: Option<String>,
    },
}

/// Fetch the first candidate for `raw_path` that exists in the repository.
///
/// Not-found failures move on to the next candidate. Any other failure aborts
/// the loop and is returned unchanged.
pub async fn resolve_file(
    repo: &dyn SourceRepository,
    raw_path: &str,
    git_ref: Option<&str>,
) -> Result<Resolution, SourceError> {
    let mut tried = Vec::new();
    let mut last_error = None;

    for candidate in build_path_candidates(raw_path) {
        tracing::debug!(%candidate, "probing repository path");
        tried.push(candidate.clone());
        match repo.get_file(&candidate, git_ref).await {
            Ok(file) => {
                return Ok(Resolution::Found {
                    path: candidate,
                    file,
                    tried,
                })
            }
            Err(err) if err.is_not_found() => last_error = Some(err.to_string()),
            Err(err) => {
                tracing::warn!(%candidate, error = %err, "path resolution aborted");
                return Err(err);
            }
        }
    }

    tracing::debug!(tried = tried.len(), "no candidate path resolved");
    Ok(Resolution::Missing { tried, last_error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_core::testing::InMemoryRepository;
    use autopilot_core::Service;

    #[tokio::test]
    async fn stops_at_first_existing_candidate() {
        let repo = InMemoryRepository::new("main")
            .with_file("src/app/Nav.tsx", "a")
            .with_file("apps/web/src/app/Nav.tsx", "b");
        let res = resolve_file(&repo, "/app/Nav.tsx", None).await.unwrap();

        let Resolution::Found { path, file, tried } = res else {
            panic!("expected a resolved file");
        };
        assert_eq!(path, "src/app/Nav.tsx");
        assert_eq!(file.text, "a");
        assert_eq!(tried, vec!["app/Nav.tsx", "src/app/Nav.tsx"]);
        assert_eq!(repo.fetched(), tried);
    }

    #[tokio::test]
    async fn upstream_failure_aborts_without_trying_the_rest() {
        let boom = SourceError::Status {
            service: Service::Github,
            status: 500,
            body: "Internal Server Error".into(),
        };
        let repo = InMemoryRepository::new("main")
            .with_failure("src/a.ts", boom.clone())
            .with_file("apps/web/src/a.ts", "never reached");

        let err = resolve_file(&repo, "src/a.ts", None).await.unwrap_err();
        assert_eq!(err, boom);
        assert_eq!(repo.fetched(), vec!["src/a.ts"]);
    }

    #[tokio::test]
    async fn transport_and_decode_failures_abort_after_earlier_misses() {
        let failures = [
            SourceError::Transport {
                service: Service::Github,
                message: "connection reset".into(),
            },
            SourceError::Decode {
                service: Service::Github,
                resource: "src/lib/a.ts".into(),
                message: "expected base64 content".into(),
            },
        ];
        for failure in failures {
            let repo = InMemoryRepository::new("main")
                .with_failure("src/lib/a.ts", failure.clone())
                .with_file("apps/web/src/lib/a.ts", "never reached");

            let err = resolve_file(&repo, "lib/a.ts", None).await.unwrap_err();
            assert_eq!(err, failure);
            assert_eq!(repo.fetched(), vec!["lib/a.ts", "src/lib/a.ts"]);
        }
    }

    #[tokio::test]
    async fn exhausting_candidates_reports_every_attempt() {
        let repo = InMemoryRepository::new("main");
        let res = resolve_file(&repo, "lib/x.ts", Some("dev")).await.unwrap();

        let Resolution::Missing { tried, last_error } = res else {
            panic!("expected a miss");
        };
        assert_eq!(
            tried,
            vec![
                "lib/x.ts",
                "src/lib/x.ts",
                "apps/web/src/lib/x.ts",
                "apps/frontend/src/lib/x.ts",
                "frontend/src/lib/x.ts",
                "client/src/lib/x.ts",
                "packages/web/src/lib/x.ts",
            ]
        );
        assert_eq!(
            last_error.as_deref(),
            Some("GitHub resource not found: packages/web/src/lib/x.ts")
        );
    }

    #[tokio::test]
    async fn empty_path_probes_nothing() {
        let repo = InMemoryRepository::new("main");
        let res = resolve_file(&repo, "webpack:///", None).await.unwrap();
        assert_eq!(
            res,
            Resolution::Missing {
                tried: vec![],
                last_error: None
            }
        );
        assert!(repo.fetched().is_empty());
    }
}
