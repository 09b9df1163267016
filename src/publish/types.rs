use std::fmt;

/// How generated text combines with the existing description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationDecision {
    /// Existing body had template headings; the prompt already merged it
    Replace,
    /// Existing body is unstructured text; keep it above the generated text
    PrependExisting,
    /// Existing body is empty
    PassThrough,
}

impl fmt::Display for ReconciliationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationDecision::Replace => write!(f, "replace"),
            ReconciliationDecision::PrependExisting => write!(f, "prepend-existing"),
            ReconciliationDecision::PassThrough => write!(f, "pass-through"),
        }
    }
}

/// Final description and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub decision: ReconciliationDecision,
    pub body: String,
}
