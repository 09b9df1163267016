pub mod builder;
pub mod sections;

pub use builder::{GenerationRequest, MergeFlags, Template};
pub use sections::{SectionMap, SectionName};

use crate::analysis::Signals;
use crate::pr::PullRequestContext;

/// Skeleton and prompt for one run.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub template: Template,
    pub request: GenerationRequest,
}

/// Build the skeleton, derive the merge rules and assemble the prompt.
pub fn prepare(ctx: &PullRequestContext, sections: &SectionMap, signals: &Signals) -> Prepared {
    let template = Template::build(sections, signals);
    let flags = MergeFlags::new(&template, sections, signals, ctx);
    let request = GenerationRequest::build(ctx, &template, &flags);
    Prepared { template, request }
}

/// Skeleton sections missing from generated text.
///
/// API is exempt: the model is allowed to drop it when the change turns
/// out not to touch an API.
pub fn missing_sections(generated: &str, template: &Template) -> Vec<SectionName> {
    let found = SectionMap::extract(generated);
    template
        .names()
        .filter(|name| *name != SectionName::Api && !found.is_present(*name))
        .collect()
}
