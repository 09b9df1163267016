use std::fmt;

/// Snapshot of everything the generator needs to know about a pull request.
/// Built once by the collector and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PullRequestContext {
    pub owner: String,
    pub repo: String,
    /// PR number (e.g., 42)
    pub number: u64,
    /// Head branch name, used for ticket resolution
    pub branch: String,
    /// Commit messages in the order GitHub lists them
    pub commit_messages: Vec<String>,
    /// Changed files in the order GitHub lists them
    pub file_changes: Vec<FileChange>,
    /// Unified diff, possibly capped
    pub diff: Diff,
    /// Current description, trimmed; empty when the PR has none
    pub existing_body: String,
}

/// A single changed file as reported by the files endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// File path (e.g., "src/routes/user.js")
    pub path: String,
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// GitHub's per-file `status` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    Other(String),
}

impl ChangeKind {
    pub fn from_status(status: &str) -> Self {
        match status {
            "added" => ChangeKind::Added,
            "removed" => ChangeKind::Removed,
            "modified" => ChangeKind::Modified,
            "renamed" => ChangeKind::Renamed,
            "copied" => ChangeKind::Copied,
            "changed" => ChangeKind::Changed,
            "unchanged" => ChangeKind::Unchanged,
            other => ChangeKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::Modified => "modified",
            ChangeKind::Renamed => "renamed",
            ChangeKind::Copied => "copied",
            ChangeKind::Changed => "changed",
            ChangeKind::Unchanged => "unchanged",
            ChangeKind::Other(s) => s,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified diff text plus whether it was cut short.
/// A truncated diff is incomplete evidence: the absence of a signature in it
/// says nothing about the part that was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub text: String,
    pub truncated: bool,
}

impl Diff {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_from_status() {
        assert_eq!(ChangeKind::from_status("added"), ChangeKind::Added);
        assert_eq!(ChangeKind::from_status("removed"), ChangeKind::Removed);
        assert_eq!(ChangeKind::from_status("renamed"), ChangeKind::Renamed);
        assert_eq!(
            ChangeKind::from_status("something-new"),
            ChangeKind::Other("something-new".to_string())
        );
    }

    #[test]
    fn test_change_kind_display_matches_status() {
        for status in ["added", "removed", "modified", "renamed", "copied", "changed", "unchanged"] {
            assert_eq!(ChangeKind::from_status(status).to_string(), status);
        }
    }

    #[test]
    fn test_empty_diff() {
        let diff = Diff::empty();
        assert!(diff.text.is_empty());
        assert!(!diff.truncated);
    }
}
