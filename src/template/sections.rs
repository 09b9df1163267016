use std::collections::BTreeMap;
use std::fmt;

/// The closed set of sections the tool knows how to fill and merge.
///
/// Variant order is the canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionName {
    Description,
    Changes,
    Api,
    Test,
    Ticket,
}

impl SectionName {
    pub const ALL: [SectionName; 5] = [
        SectionName::Description,
        SectionName::Changes,
        SectionName::Api,
        SectionName::Test,
        SectionName::Ticket,
    ];

    /// Heading text as it appears after `## `.
    pub fn title(self) -> &'static str {
        match self {
            SectionName::Description => "Description",
            SectionName::Changes => "Changes",
            SectionName::Api => "API",
            SectionName::Test => "Test",
            SectionName::Ticket => "Ticket",
        }
    }

    /// Exact, case-sensitive lookup by heading text.
    pub fn from_title(title: &str) -> Option<SectionName> {
        SectionName::ALL.into_iter().find(|name| name.title() == title)
    }

    pub fn heading(self) -> String {
        format!("## {}", self.title())
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// An ATX heading line: 1-6 `#` followed by a space or end of line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    /// Text after the `#` run and its single separating space, trailing whitespace removed
    pub text: String,
}

impl Heading {
    fn parse(line: &str) -> Option<Heading> {
        let level = line.bytes().take_while(|&b| b == b'#').count();
        if level == 0 || level > 6 {
            return None;
        }
        let rest = &line[level..];
        let text = if rest.is_empty() {
            ""
        } else {
            rest.strip_prefix(' ')?
        };
        Some(Heading {
            level,
            text: text.trim_end().to_string(),
        })
    }

    /// Section this heading opens, if it is exactly `## <Name>`.
    pub fn section(&self) -> Option<SectionName> {
        if self.level == 2 {
            SectionName::from_title(&self.text)
        } else {
            None
        }
    }
}

/// A heading-delimited region of a Markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// None for text before the first heading
    pub heading: Option<Heading>,
    /// Raw lines up to the next boundary heading, untrimmed
    pub body: String,
}

/// Tracks whether the current line sits inside fenced code (``` or ~~~).
#[derive(Debug, Default)]
struct Fence {
    open: Option<&'static str>,
}

impl Fence {
    /// Feed one line. Returns true when the line is a fence delimiter or fenced content.
    fn step(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        match self.open {
            Some(marker) => {
                if trimmed.starts_with(marker) {
                    self.open = None;
                }
                true
            }
            None => {
                self.open = ["```", "~~~"].into_iter().find(|m| trimmed.starts_with(m));
                self.open.is_some()
            }
        }
    }
}

/// Split a Markdown body into blocks.
///
/// Every ATX heading (levels 1-6) starts a new block, so a section ends at
/// the next heading of any kind. Lines inside fenced code are never
/// headings. Matching is case-sensitive and requires the `#` run to start
/// the line.
pub fn scan(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current = Block {
        heading: None,
        body: String::new(),
    };
    let mut fence = Fence::default();

    for line in text.lines() {
        if !fence.step(line) {
            if let Some(heading) = Heading::parse(line) {
                let finished = std::mem::replace(
                    &mut current,
                    Block {
                        heading: Some(heading),
                        body: String::new(),
                    },
                );
                blocks.push(finished);
                continue;
            }
        }
        current.body.push_str(line);
        current.body.push('\n');
    }
    blocks.push(current);

    // Drop an empty leading preamble so "no text before the first heading" has no block.
    if blocks
        .first()
        .is_some_and(|b| b.heading.is_none() && b.body.trim().is_empty())
    {
        blocks.remove(0);
    }
    blocks
}

/// Sections extracted from an existing description.
///
/// A name is present when its heading appeared in the source, even if the
/// section body was empty. Names that never appeared are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    sections: BTreeMap<SectionName, String>,
    free_text: bool,
}

impl SectionMap {
    /// Extract known sections from a description.
    ///
    /// The first `## <Name>` heading for each name is authoritative; later
    /// duplicates are ignored and counted as free-form text.
    pub fn extract(body: &str) -> SectionMap {
        let mut map = SectionMap::default();
        for block in scan(body) {
            let content = block.body.trim();
            match block.heading.as_ref().and_then(Heading::section) {
                Some(name) if !map.sections.contains_key(&name) => {
                    map.sections.insert(name, content.to_string());
                }
                Some(_) => map.free_text = true,
                None => {
                    // Unrecognized headings are operator structure worth keeping.
                    if block.heading.is_some() || !content.is_empty() {
                        map.free_text = true;
                    }
                }
            }
        }
        map
    }

    #[cfg(test)]
    pub fn insert(&mut self, name: SectionName, content: impl Into<String>) {
        self.sections.insert(name, content.into());
    }

    pub fn is_present(&self, name: SectionName) -> bool {
        self.sections.contains_key(&name)
    }

    /// Trimmed content of a present section.
    pub fn content(&self, name: SectionName) -> Option<&str> {
        self.sections.get(&name).map(String::as_str)
    }

    /// Whether any recognized heading was found.
    pub fn any_present(&self) -> bool {
        !self.sections.is_empty()
    }

    /// Present names in canonical order.
    pub fn present(&self) -> impl Iterator<Item = SectionName> + '_ {
        self.sections.keys().copied()
    }

    /// Whether the source had text outside the first occurrence of each known section.
    pub fn has_free_text(&self) -> bool {
        self.free_text
    }

    /// Render present sections in canonical order; extracting the result
    /// yields the same sections.
    #[cfg(test)]
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|(name, content)| render_section(*name, content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// `## Name` followed by its content on the next line, if any.
///
/// A code fence left open by the content is closed so that headings
/// rendered after this section are not swallowed into it.
pub fn render_section(name: SectionName, content: &str) -> String {
    if content.is_empty() {
        return name.heading();
    }
    let mut rendered = format!("{}\n{}", name.heading(), content);
    if let Some(marker) = unclosed_fence(content) {
        rendered.push('\n');
        rendered.push_str(marker);
    }
    rendered
}

fn unclosed_fence(text: &str) -> Option<&'static str> {
    let mut fence = Fence::default();
    for line in text.lines() {
        fence.step(line);
    }
    fence.open
}
