use regex::Regex;

use super::AnalysisError;
use crate::config::{MissingTicketPolicy, TicketConfig};

/// Issue-tracker reference inferred from the branch name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketInfo {
    /// Ticket key (e.g., "CDB-1234")
    pub id: String,
    /// Browse URL; None when no tracker base URL is configured
    pub url: Option<String>,
}

impl TicketInfo {
    /// Markdown used to seed the Ticket section.
    pub fn to_markdown(&self) -> String {
        match &self.url {
            Some(url) => format!("[{}]({})", self.id, url),
            None => self.id.clone(),
        }
    }
}

/// Matches `PREFIX-<digits>` against branch names for a fixed prefix set.
pub struct TicketResolver {
    pattern: Option<Regex>,
    base_url: Option<String>,
    on_missing: MissingTicketPolicy,
    sentinel: String,
}

impl TicketResolver {
    pub fn new(config: &TicketConfig) -> Result<Self, AnalysisError> {
        let prefixes: Vec<String> = config
            .prefixes
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(regex::escape)
            .collect();

        // No prefixes means nothing can match; an empty alternation would match "-123".
        let pattern = if prefixes.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"(?:{})-\d+", prefixes.join("|")))?)
        };

        Ok(Self {
            pattern,
            base_url: config
                .base_url
                .as_deref()
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            on_missing: config.on_missing,
            sentinel: config.sentinel.clone(),
        })
    }

    /// First ticket id appearing in the branch name.
    pub fn find_id<'a>(&self, branch: &'a str) -> Option<&'a str> {
        self.pattern
            .as_ref()
            .and_then(|re| re.find(branch))
            .map(|m| m.as_str())
    }

    /// Resolve the ticket for a branch, applying the missing-ticket policy.
    pub fn resolve(&self, branch: &str) -> Option<TicketInfo> {
        let id = match (self.find_id(branch), self.on_missing) {
            (Some(id), _) => id.to_string(),
            (None, MissingTicketPolicy::Sentinel) => self.sentinel.clone(),
            (None, MissingTicketPolicy::Omit) => return None,
        };
        let url = self.base_url.as_ref().map(|base| format!("{base}/{id}"));
        Some(TicketInfo { id, url })
    }
}
