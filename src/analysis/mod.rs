pub mod api;
pub mod ticket;

pub use api::ApiDetector;
pub use ticket::{TicketInfo, TicketResolver};

use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::pr::PullRequestContext;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid ticket pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Signals derived from the context that shape the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signals {
    pub api_relevant: bool,
    pub ticket: Option<TicketInfo>,
}

/// Run the ticket resolver and API heuristic. Both are pure functions of the
/// context and configuration, so their order does not matter.
pub fn run_all(ctx: &PullRequestContext, config: &Config) -> Result<Signals, AnalysisError> {
    let ticket = TicketResolver::new(&config.ticket)?.resolve(&ctx.branch);
    debug!(ticket = ?ticket.as_ref().map(|t| t.id.as_str()), "ticket resolved");

    let evidence = ApiDetector::new(&config.api).detect(ctx);
    match &evidence {
        Some(evidence) => debug!(%evidence, "api relevant"),
        None => debug!("no api evidence"),
    }

    Ok(Signals {
        api_relevant: evidence.is_some(),
        ticket,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pr::types::ChangeKind;
    use crate::pr::{Diff, FileChange};

    /// Helper to create a minimal context for testing.
    pub fn test_context() -> PullRequestContext {
        PullRequestContext {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            number: 7,
            branch: "main".to_string(),
            commit_messages: vec!["Initial commit".to_string()],
            file_changes: vec![FileChange::new("src/lib.rs", ChangeKind::Modified)],
            diff: Diff::empty(),
            existing_body: String::new(),
        }
    }

    #[test]
    fn test_run_all_with_ticket_and_api() {
        let mut ctx = test_context();
        ctx.branch = "feature/CDB-1234-fix".to_string();
        ctx.file_changes = vec![FileChange::new("src/routes/user.js", ChangeKind::Added)];
        let signals = run_all(&ctx, &Config::default()).unwrap();
        assert!(signals.api_relevant);
        assert_eq!(signals.ticket.unwrap().id, "CDB-1234");
    }

    #[test]
    fn test_run_all_plain_branch() {
        let signals = run_all(&test_context(), &Config::default()).unwrap();
        assert!(!signals.api_relevant);
        assert!(signals.ticket.is_none());
    }
}
