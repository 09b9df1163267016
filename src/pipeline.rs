use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::analysis::{self, AnalysisError};
use crate::config::Settings;
use crate::llm::{Generator, LlmError};
use crate::pr::{self, PrError, SourceControl};
use crate::publish::{self, ReconcileError, ReconciliationDecision};
use crate::template::{self, SectionMap};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to fetch pull request data: {0}")]
    Fetch(#[source] PrError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Failed to generate PR description: {0}")]
    Generation(#[from] LlmError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Failed to update PR description: {0}")]
    Publish(#[source] PrError),
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub decision: ReconciliationDecision,
    pub body: String,
    /// False for dry runs
    pub published: bool,
}

/// Generate and publish the description for one pull request.
///
/// Stages run strictly in order; any fatal error aborts before the single
/// publish call, so the description is updated once or not at all.
pub async fn run(
    settings: &Settings,
    scm: &dyn SourceControl,
    generator: &dyn Generator,
    dry_run: bool,
) -> Result<Outcome, RunError> {
    let target = &settings.target;
    let config = &settings.config;

    info!("collecting pull request context");
    let ctx = pr::collect_context(scm, target, &config.diff)
        .await
        .map_err(RunError::Fetch)?;
    info!(commits = ctx.commit_messages.len(), files = ctx.file_changes.len(), diff_truncated = ctx.diff.truncated, "context collected");

    let sections = SectionMap::extract(&ctx.existing_body);
    debug!(present = ?sections.present().collect::<Vec<_>>(), free_text = sections.has_free_text(), "extracted sections");

    let signals = analysis::run_all(&ctx, config)?;
    info!(api_relevant = signals.api_relevant, ticket = ?signals.ticket.as_ref().map(|t| t.id.as_str()), "analysis complete");

    let prepared = template::prepare(&ctx, &sections, &signals);
    debug!(sections = ?prepared.template.names().collect::<Vec<_>>(), rules = prepared.request.instructions.len(), "template built");

    info!(backend = %generator.name(), "generating description");
    let generated = generator
        .generate(&prepared.request)
        .instrument(info_span!("generate"))
        .await?;

    let missing = template::missing_sections(&generated, &prepared.template);
    if !missing.is_empty() {
        warn!(?missing, "generated description is missing template sections");
    }

    let reconciled = publish::reconcile(&ctx.existing_body, &sections, &generated, &config.reconcile)?;
    info!(decision = %reconciled.decision, "reconciled with existing description");

    if dry_run {
        info!("dry run, skipping publish");
    } else {
        publish::publish(scm, target, &reconciled.body)
            .await
            .map_err(RunError::Publish)?;
    }

    Ok(Outcome {
        decision: reconciled.decision,
        body: reconciled.body,
        published: !dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Credentials};
    use crate::llm::testing::FakeGenerator;
    use crate::pr::testing::{test_target, FakeScm};
    use crate::pr::types::ChangeKind;
    use crate::pr::FileChange;

    fn settings() -> Settings {
        Settings {
            target: test_target(),
            credentials: Credentials {
                openai_api_key: "sk-test".to_string(),
                github_token: "ghp_test".to_string(),
            },
            config: Config::default(),
        }
    }

    const GENERATED: &str = "## Description\nAdds a route\n\n## Changes\n- route\n\n## Test\nrun it";

    #[tokio::test]
    async fn test_fresh_pr_is_published_verbatim() {
        let scm = FakeScm::new();
        let generator = FakeGenerator::replying(GENERATED);
        let outcome = run(&settings(), &scm, &generator, false).await.unwrap();
        assert_eq!(outcome.decision, ReconciliationDecision::PassThrough);
        assert!(outcome.published);
        assert_eq!(scm.published(), vec![GENERATED]);
    }

    #[tokio::test]
    async fn test_unstructured_body_is_kept_above_generated_text() {
        let mut scm = FakeScm::new();
        scm.body = "Some notes".to_string();
        let generator = FakeGenerator::replying("X");
        run(&settings(), &scm, &generator, false).await.unwrap();
        assert_eq!(scm.published(), vec!["Some notes\n\n---\n\nX"]);
        assert!(generator.last_prompt().unwrap().contains("Existing PR description:\nSome notes"));
    }

    #[tokio::test]
    async fn test_structured_body_is_replaced_and_preserved_in_prompt() {
        let mut scm = FakeScm::new();
        scm.body = "## Description\nfoo\n\n## Changes\n- old item".to_string();
        let generator = FakeGenerator::replying("Y");
        let outcome = run(&settings(), &scm, &generator, false).await.unwrap();
        assert_eq!(outcome.decision, ReconciliationDecision::Replace);
        assert_eq!(scm.published(), vec!["Y"]);

        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("## Changes\n- old item"));
        assert!(prompt.contains("add new items as additional entries"));
    }

    #[tokio::test]
    async fn test_empty_generation_aborts_without_publish() {
        let scm = FakeScm::new();
        let generator = FakeGenerator::replying("  \n ");
        let err = run(&settings(), &scm, &generator, false).await.unwrap_err();
        assert!(matches!(err, RunError::Reconcile(ReconcileError::EmptyGeneration)));
        assert!(scm.published().is_empty());
    }

    #[tokio::test]
    async fn test_diff_failure_does_not_abort() {
        let mut scm = FakeScm::new();
        scm.diff = None;
        let generator = FakeGenerator::replying(GENERATED);
        run(&settings(), &scm, &generator, false).await.unwrap();
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("Code diff (truncated if too long):\n\n\nFormat the description"));
        assert_eq!(scm.published().len(), 1);
    }

    #[tokio::test]
    async fn test_required_fetch_failure_aborts_before_generation() {
        let mut scm = FakeScm::new();
        scm.fail_commits = true;
        let generator = FakeGenerator::replying(GENERATED);
        let err = run(&settings(), &scm, &generator, false).await.unwrap_err();
        assert!(matches!(err, RunError::Fetch(_)));
        assert!(generator.last_prompt().is_none());
        assert!(scm.published().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_is_fatal() {
        let mut scm = FakeScm::new();
        scm.fail_update = true;
        let generator = FakeGenerator::replying(GENERATED);
        let err = run(&settings(), &scm, &generator, false).await.unwrap_err();
        assert!(matches!(err, RunError::Publish(_)));
    }

    #[tokio::test]
    async fn test_api_route_adds_api_section_and_ticket() {
        let mut scm = FakeScm::new();
        scm.files = vec![FileChange::new("src/routes/user.js", ChangeKind::Added)];
        let generator = FakeGenerator::replying(GENERATED);
        run(&settings(), &scm, &generator, false).await.unwrap();
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("## API\n"));
        assert!(prompt.contains("## Ticket\nCDB-1234"));
    }

    #[tokio::test]
    async fn test_non_api_change_omits_api_section() {
        let scm = FakeScm::new();
        let generator = FakeGenerator::replying(GENERATED);
        run(&settings(), &scm, &generator, false).await.unwrap();
        let prompt = generator.last_prompt().unwrap();
        assert!(!prompt.contains("## API\n"));
        assert!(prompt.contains("Do not add a `## API` section."));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_publish() {
        let scm = FakeScm::new();
        let generator = FakeGenerator::replying(GENERATED);
        let outcome = run(&settings(), &scm, &generator, true).await.unwrap();
        assert!(!outcome.published);
        assert_eq!(outcome.body, GENERATED);
        assert!(scm.published().is_empty());
    }
}
