pub mod types;

pub use types::{Reconciled, ReconciliationDecision};

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::{ReconcileConfig, Target};
use crate::pr::{PrError, SourceControl};
use crate::template::SectionMap;

/// Placed between operator text and generated text.
pub const SEPARATOR: &str = "\n\n---\n\n";

/// Hidden tag opening a generated block that follows operator text.
pub const MARKER: &str = "<!-- pr-describer:generated -->";

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("LLM returned an empty response; refusing to publish a blank description")]
    EmptyGeneration,
}

/// Choose how to combine generated text with the existing body.
///
/// Headings inside a previously generated, marker-tagged block do not count
/// as operator structure; only the text before that block is inspected.
pub fn decide(existing: &str, sections: &SectionMap) -> ReconciliationDecision {
    let structured = match generated_block_start(existing) {
        Some(pos) => SectionMap::extract(&existing[..pos]).any_present(),
        None => sections.any_present(),
    };
    if structured {
        ReconciliationDecision::Replace
    } else if operator_text(existing).is_empty() {
        ReconciliationDecision::PassThrough
    } else {
        ReconciliationDecision::PrependExisting
    }
}

/// Operator-authored part of a body: everything before a previously
/// generated, marker-tagged block.
pub fn operator_text(existing: &str) -> &str {
    let text = match generated_block_start(existing) {
        Some(pos) => &existing[..pos],
        None => existing,
    };
    text.trim()
}

fn generated_block_start(existing: &str) -> Option<usize> {
    existing.find(&format!("{SEPARATOR}{MARKER}"))
}

/// Combine generated text with the existing description.
///
/// Generated text that is empty after trimming is an error: nothing is
/// published rather than a blank or partial description.
pub fn reconcile(
    existing: &str,
    sections: &SectionMap,
    generated: &str,
    config: &ReconcileConfig,
) -> Result<Reconciled, ReconcileError> {
    let generated = generated.trim();
    if generated.is_empty() {
        return Err(ReconcileError::EmptyGeneration);
    }

    let decision = decide(existing, sections);
    let body = match decision {
        ReconciliationDecision::Replace | ReconciliationDecision::PassThrough => generated.to_string(),
        ReconciliationDecision::PrependExisting => {
            let operator = operator_text(existing);
            if config.marker {
                format!("{operator}{SEPARATOR}{MARKER}\n{generated}")
            } else {
                format!("{operator}{SEPARATOR}{generated}")
            }
        }
    };
    debug!(%decision, body_chars = body.len(), "reconciled description");

    Ok(Reconciled { decision, body })
}

/// Write the final description back to the pull request.
#[instrument(skip(scm, body), fields(pr = target.pr_number, body_chars = body.len()))]
pub async fn publish(scm: &dyn SourceControl, target: &Target, body: &str) -> Result<(), PrError> {
    scm.update_body(target, body).await?;
    info!("PR description updated");
    Ok(())
}
