pub mod diff;
pub mod github;
pub mod types;

pub use types::{Diff, FileChange, PullRequestContext};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::{DiffConfig, DiffFailurePolicy, Target};

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API returned HTTP {status} for {endpoint}: {message}")]
    Api {
        status: u16,
        endpoint: String,
        message: String,
    },
}

/// Operations consumed from the source-control host.
/// Implementations must be Send + Sync so the reads can be joined concurrently.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Commit messages of the pull request, oldest first.
    async fn list_commits(&self, target: &Target) -> Result<Vec<String>, PrError>;

    /// Changed files of the pull request.
    async fn list_files(&self, target: &Target) -> Result<Vec<FileChange>, PrError>;

    /// Current description; empty when the PR has no body.
    async fn pull_request_body(&self, target: &Target) -> Result<String, PrError>;

    /// Raw unified diff of the pull request.
    async fn diff(&self, target: &Target) -> Result<String, PrError>;

    /// Replace the pull request description.
    async fn update_body(&self, target: &Target, body: &str) -> Result<(), PrError>;
}

/// Gather the immutable context for one run.
///
/// Commits, files and the PR record are fetched concurrently and are all
/// required. The diff is fetched afterwards; under
/// [`DiffFailurePolicy::Skip`] a failure is logged and an empty diff is used.
#[instrument(skip(scm, diff_config), fields(owner = %target.owner, repo = %target.repo, pr = target.pr_number))]
pub async fn collect_context(
    scm: &dyn SourceControl,
    target: &Target,
    diff_config: &DiffConfig,
) -> Result<PullRequestContext, PrError> {
    let (commit_messages, file_changes, body) = tokio::try_join!(
        scm.list_commits(target),
        scm.list_files(target),
        scm.pull_request_body(target),
    )?;
    debug!(commits = commit_messages.len(), files = file_changes.len(), body_chars = body.len(), "fetched PR record");

    let diff = match scm.diff(target).await {
        Ok(raw) => {
            let capped = diff::cap_diff(&raw, diff_config.max_chars);
            if capped.truncated {
                warn!(raw_chars = raw.chars().count(), limit = diff_config.max_chars, "diff truncated");
            }
            capped
        }
        Err(e) if diff_config.on_failure == DiffFailurePolicy::Skip => {
            warn!(error = %e, "unable to fetch diff, proceeding without it");
            Diff::empty()
        }
        Err(e) => return Err(e),
    };

    Ok(PullRequestContext {
        owner: target.owner.clone(),
        repo: target.repo.clone(),
        number: target.pr_number,
        branch: target.branch.clone(),
        commit_messages,
        file_changes,
        diff,
        existing_body: body.trim().to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::testing::{test_target, FakeScm};
    use super::*;

    #[tokio::test]
    async fn test_collect_context_populates_all_fields() {
        let mut scm = FakeScm::new();
        scm.body = "  Some notes \n".to_string();
        scm.diff = Some("diff --git a/src/lib.rs b/src/lib.rs\n".to_string());

        let ctx = collect_context(&scm, &test_target(), &DiffConfig::default())
            .await
            .unwrap();
        assert_eq!(ctx.owner, "acme");
        assert_eq!(ctx.number, 7);
        assert_eq!(ctx.branch, "feature/CDB-1234-fix");
        assert_eq!(ctx.commit_messages, vec!["Add user route"]);
        assert_eq!(ctx.file_changes.len(), 1);
        assert_eq!(ctx.existing_body, "Some notes");
        assert!(ctx.diff.text.starts_with("diff --git"));
    }

    #[tokio::test]
    async fn test_diff_failure_is_soft_by_default() {
        let mut scm = FakeScm::new();
        scm.diff = None;
        let ctx = collect_context(&scm, &test_target(), &DiffConfig::default())
            .await
            .unwrap();
        assert_eq!(ctx.diff.text, "");
        assert!(!ctx.diff.truncated);
    }

    #[tokio::test]
    async fn test_diff_failure_aborts_under_abort_policy() {
        let mut scm = FakeScm::new();
        scm.diff = None;
        let config = DiffConfig {
            on_failure: DiffFailurePolicy::Abort,
            ..DiffConfig::default()
        };
        assert!(collect_context(&scm, &test_target(), &config).await.is_err());
    }

    #[tokio::test]
    async fn test_required_fetch_failure_aborts() {
        let mut scm = FakeScm::new();
        scm.fail_commits = true;
        let err = collect_context(&scm, &test_target(), &DiffConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("commits"));
    }

    #[tokio::test]
    async fn test_long_diff_is_capped() {
        let mut scm = FakeScm::new();
        scm.diff = Some("+".repeat(50));
        let config = DiffConfig {
            max_chars: 10,
            ..DiffConfig::default()
        };
        let ctx = collect_context(&scm, &test_target(), &config).await.unwrap();
        assert!(ctx.diff.truncated);
        assert!(ctx.diff.text.starts_with("++++++++++\n\n[Diff truncated]"));
    }
}
