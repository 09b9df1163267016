use std::fmt;

use super::sections::{render_section, SectionMap, SectionName};
use crate::analysis::Signals;
use crate::pr::PullRequestContext;

/// Placeholder seeded into a section the existing description lacks.
fn placeholder(name: SectionName) -> &'static str {
    match name {
        SectionName::Description => "<!-- Replace this line to describe what this PR does -->",
        SectionName::Changes => "<!-- Replace this line to list changes -->",
        SectionName::Api => {
            "<!-- Replace this line to describe API changes (endpoints, request/response shapes) -->"
        }
        SectionName::Test => "<!-- Replace this line to explain how to test -->",
        SectionName::Ticket => "<!-- Ticket reference -->",
    }
}

/// One section of the output skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonSection {
    pub name: SectionName,
    pub seed: String,
    /// Seed came from the existing description rather than a placeholder
    pub from_existing: bool,
}

/// Ordered section skeleton handed to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub sections: Vec<SkeletonSection>,
}

impl Template {
    /// Pick the sections to emit and seed each one.
    ///
    /// Order is Description, Changes, API, Test, Ticket. API appears only
    /// when the heading already existed or the change looks API-relevant;
    /// Ticket only when a ticket was resolved.
    pub fn build(sections: &SectionMap, signals: &Signals) -> Template {
        let include = |name: SectionName| match name {
            SectionName::Api => sections.is_present(name) || signals.api_relevant,
            SectionName::Ticket => signals.ticket.is_some(),
            _ => true,
        };

        let chosen = SectionName::ALL
            .into_iter()
            .filter(|name| include(*name))
            .map(|name| match sections.content(name) {
                Some(prior) => SkeletonSection {
                    name,
                    seed: prior.to_string(),
                    from_existing: true,
                },
                None => {
                    let seed = match (&signals.ticket, name) {
                        (Some(ticket), SectionName::Ticket) => ticket.to_markdown(),
                        _ => placeholder(name).to_string(),
                    };
                    SkeletonSection {
                        name,
                        seed,
                        from_existing: false,
                    }
                }
            })
            .collect();

        Template { sections: chosen }
    }

    pub fn includes(&self, name: SectionName) -> bool {
        self.sections.iter().any(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = SectionName> + '_ {
        self.sections.iter().map(|s| s.name)
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| render_section(s.name, &s.seed))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Typed conditions the merge rules are derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeFlags {
    /// Sections in the skeleton whose heading already existed
    pub preserved: Vec<SectionName>,
    pub api_heading_present: bool,
    pub api_relevant: bool,
    pub ticket_included: bool,
    pub free_text: bool,
    pub diff_truncated: bool,
}

impl MergeFlags {
    pub fn new(template: &Template, sections: &SectionMap, signals: &Signals, ctx: &PullRequestContext) -> Self {
        Self {
            preserved: template
                .sections
                .iter()
                .filter(|s| s.from_existing)
                .map(|s| s.name)
                .collect(),
            api_heading_present: sections.is_present(SectionName::Api),
            api_relevant: signals.api_relevant,
            ticket_included: template.includes(SectionName::Ticket),
            free_text: sections.has_free_text(),
            diff_truncated: ctx.diff.truncated,
        }
    }
}

/// A single merge rule given to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    PreserveSection(SectionName),
    AppendChanges,
    AddApiIfRelevant,
    OmitApi,
    KeepTicket,
    KeepFreeText,
    IncompleteDiff,
    OutputFormat,
}

impl Instruction {
    /// Fixed list of rules for the given flags, in a stable order.
    pub fn for_flags(flags: &MergeFlags) -> Vec<Instruction> {
        let mut rules = Vec::new();
        for name in &flags.preserved {
            if *name == SectionName::Ticket {
                continue;
            }
            rules.push(Instruction::PreserveSection(*name));
            if *name == SectionName::Changes {
                rules.push(Instruction::AppendChanges);
            }
        }
        if !flags.api_heading_present {
            if flags.api_relevant {
                rules.push(Instruction::AddApiIfRelevant);
            } else {
                rules.push(Instruction::OmitApi);
            }
        }
        if flags.ticket_included {
            rules.push(Instruction::KeepTicket);
        }
        if flags.free_text {
            rules.push(Instruction::KeepFreeText);
        }
        if flags.diff_truncated {
            rules.push(Instruction::IncompleteDiff);
        }
        rules.push(Instruction::OutputFormat);
        rules
    }

    pub fn text(self) -> String {
        match self {
            Instruction::PreserveSection(name) => format!(
                "The `{}` section already exists. Preserve its content and enhance it with the new changes; do not replace or remove it.",
                name.heading()
            ),
            Instruction::AppendChanges => format!(
                "In `{}`, keep every existing entry and add new items as additional entries. Never overwrite or drop existing entries.",
                SectionName::Changes.heading()
            ),
            Instruction::AddApiIfRelevant => format!(
                "Add the `{}` section only if the changes add, remove or modify an API surface (endpoints, routes, request/response shapes). If they do not, omit the section and its heading entirely.",
                SectionName::Api.heading()
            ),
            Instruction::OmitApi => format!(
                "Do not add a `{}` section.",
                SectionName::Api.heading()
            ),
            Instruction::KeepTicket => format!(
                "Keep the `{}` section exactly as given in the template.",
                SectionName::Ticket.heading()
            ),
            Instruction::KeepFreeText => {
                "The existing description contains text outside the template sections. Keep that text; place it under the most fitting section or above the first heading.".to_string()
            }
            Instruction::IncompleteDiff => {
                "The code diff was truncated. Treat it as incomplete evidence and do not conclude that something is absent because it is not shown.".to_string()
            }
            Instruction::OutputFormat => {
                "Return only the Markdown description using the template headings in the given order, with no surrounding code fence or commentary.".to_string()
            }
        }
    }
}

/// Prompt plus the merge rules it embeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub instructions: Vec<String>,
}

impl GenerationRequest {
    /// Assemble the user prompt from the context, the skeleton and the merge rules.
    pub fn build(ctx: &PullRequestContext, template: &Template, flags: &MergeFlags) -> GenerationRequest {
        let instructions: Vec<String> = Instruction::for_flags(flags)
            .into_iter()
            .map(Instruction::text)
            .collect();

        let existing = if ctx.existing_body.is_empty() {
            "(No existing description)"
        } else {
            ctx.existing_body.as_str()
        };
        let commits = bullet_list(&ctx.commit_messages);
        let files = bullet_list(
            ctx.file_changes
                .iter()
                .map(|f| format!("{} ({})", f.path, f.kind)),
        );
        let rules = instructions
            .iter()
            .enumerate()
            .map(|(i, rule)| format!("{}. {}", i + 1, rule))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Generate a GitHub pull request description based on the following details:\n\n\
             Pull request: {owner}/{repo}#{number} (branch `{branch}`)\n\n\
             Existing PR description:\n{existing}\n\n\
             Commit messages:\n{commits}\n\n\
             File changes:\n{files}\n\n\
             Code diff (truncated if too long):\n{diff}\n\n\
             Format the description using this template:\n{template}\n\n\
             Merge rules:\n{rules}\n",
            owner = ctx.owner,
            repo = ctx.repo,
            number = ctx.number,
            branch = ctx.branch,
            diff = ctx.diff.text,
            template = template.render(),
        );

        GenerationRequest {
            prompt,
            instructions,
        }
    }
}

fn bullet_list<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::test_context;
    use crate::analysis::TicketInfo;

    fn signals(api_relevant: bool, ticket: Option<&str>) -> Signals {
        Signals {
            api_relevant,
            ticket: ticket.map(|id| TicketInfo {
                id: id.to_string(),
                url: Some(format!("https://tracker.example.com/browse/{id}")),
            }),
        }
    }

    fn names(template: &Template) -> Vec<SectionName> {
        template.names().collect()
    }

    #[test]
    fn test_default_skeleton_without_api_or_ticket() {
        let template = Template::build(&SectionMap::default(), &signals(false, None));
        assert_eq!(
            names(&template),
            vec![SectionName::Description, SectionName::Changes, SectionName::Test]
        );
        assert!(template.sections.iter().all(|s| !s.from_existing));
        assert!(template.render().contains("<!-- Replace this line to list changes -->"));
    }

    #[test]
    fn test_api_included_when_relevant() {
        let template = Template::build(&SectionMap::default(), &signals(true, Some("CDB-1")));
        assert_eq!(
            names(&template),
            vec![
                SectionName::Description,
                SectionName::Changes,
                SectionName::Api,
                SectionName::Test,
                SectionName::Ticket,
            ]
        );
        assert!(template
            .render()
            .ends_with("## Ticket\n[CDB-1](https://tracker.example.com/browse/CDB-1)"));
    }

    #[test]
    fn test_api_kept_when_heading_existed() {
        let map = SectionMap::extract("## API\nGET /users");
        let template = Template::build(&map, &signals(false, None));
        assert!(template.includes(SectionName::Api));
        let api = template.sections.iter().find(|s| s.name == SectionName::Api).unwrap();
        assert_eq!(api.seed, "GET /users");
        assert!(api.from_existing);
    }

    #[test]
    fn test_ticket_excluded_without_ticket_even_if_heading_existed() {
        let map = SectionMap::extract("## Ticket\nOLD-1");
        let template = Template::build(&map, &signals(false, None));
        assert!(!template.includes(SectionName::Ticket));
    }

    #[test]
    fn test_existing_content_seeds_sections() {
        let map = SectionMap::extract("## Description\nKeeps things tidy\n## Changes\n- one");
        let template = Template::build(&map, &signals(false, None));
        let rendered = template.render();
        assert!(rendered.starts_with("## Description\nKeeps things tidy\n\n## Changes\n- one\n\n## Test\n"));
    }

    #[test]
    fn test_skeleton_from_full_map_reextracts_to_same_map() {
        let mut map = SectionMap::default();
        map.insert(SectionName::Description, "desc");
        map.insert(SectionName::Changes, "- a");
        map.insert(SectionName::Api, "");
        map.insert(SectionName::Test, "cargo test");
        map.insert(SectionName::Ticket, "[CDB-1](u)");
        let template = Template::build(&map, &signals(false, Some("CDB-1")));
        assert_eq!(SectionMap::extract(&template.render()), map);
    }

    #[test]
    fn test_instructions_for_fresh_description() {
        let flags = MergeFlags::default();
        assert_eq!(
            Instruction::for_flags(&flags),
            vec![Instruction::OmitApi, Instruction::OutputFormat]
        );
    }

    #[test]
    fn test_instructions_for_existing_sections() {
        let ctx = test_context();
        let map = SectionMap::extract("## Description\nfoo\n## Changes\n- a");
        let s = signals(true, Some("CDB-1"));
        let template = Template::build(&map, &s);
        let flags = MergeFlags::new(&template, &map, &s, &ctx);
        assert_eq!(
            Instruction::for_flags(&flags),
            vec![
                Instruction::PreserveSection(SectionName::Description),
                Instruction::PreserveSection(SectionName::Changes),
                Instruction::AppendChanges,
                Instruction::AddApiIfRelevant,
                Instruction::KeepTicket,
                Instruction::OutputFormat,
            ]
        );
    }

    #[test]
    fn test_existing_api_heading_is_preserved_not_conditional() {
        let ctx = test_context();
        let map = SectionMap::extract("## API\nGET /users");
        let s = signals(false, None);
        let template = Template::build(&map, &s);
        let rules = Instruction::for_flags(&MergeFlags::new(&template, &map, &s, &ctx));
        assert!(rules.contains(&Instruction::PreserveSection(SectionName::Api)));
        assert!(!rules.contains(&Instruction::OmitApi));
        assert!(!rules.contains(&Instruction::AddApiIfRelevant));
    }

    #[test]
    fn test_free_text_and_truncation_rules() {
        let mut ctx = test_context();
        ctx.diff.truncated = true;
        let map = SectionMap::extract("Notes first\n## Description\nfoo");
        let s = signals(false, None);
        let template = Template::build(&map, &s);
        let rules = Instruction::for_flags(&MergeFlags::new(&template, &map, &s, &ctx));
        assert!(rules.contains(&Instruction::KeepFreeText));
        assert!(rules.contains(&Instruction::IncompleteDiff));
    }

    #[test]
    fn test_prompt_contains_context_and_rules() {
        let mut ctx = test_context();
        ctx.commit_messages = vec!["Add user route".to_string(), "Fix typo".to_string()];
        ctx.diff.text = "+router.get('/users')".to_string();
        let map = SectionMap::default();
        let s = signals(true, None);
        let template = Template::build(&map, &s);
        let flags = MergeFlags::new(&template, &map, &s, &ctx);
        let request = GenerationRequest::build(&ctx, &template, &flags);

        assert!(request.prompt.contains("Pull request: acme/widgets#7 (branch `main`)"));
        assert!(request.prompt.contains("Existing PR description:\n(No existing description)"));
        assert!(request.prompt.contains("Commit messages:\n- Add user route\n- Fix typo"));
        assert!(request.prompt.contains("File changes:\n- src/lib.rs (modified)"));
        assert!(request.prompt.contains("+router.get('/users')"));
        assert!(request.prompt.contains("## API\n<!--"));
        assert_eq!(request.instructions.len(), 2);
        assert!(request.prompt.contains(&format!("1. {}", request.instructions[0])));
    }

    #[test]
    fn test_prompt_includes_existing_body() {
        let mut ctx = test_context();
        ctx.existing_body = "Some notes".to_string();
        let map = SectionMap::extract(&ctx.existing_body);
        let s = signals(false, None);
        let template = Template::build(&map, &s);
        let request = GenerationRequest::build(&ctx, &template, &MergeFlags::new(&template, &map, &s, &ctx));
        assert!(request.prompt.contains("Existing PR description:\nSome notes\n"));
    }
}
