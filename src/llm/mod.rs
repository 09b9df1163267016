pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::template::GenerationRequest;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("LLM response contained no choices")]
    NoChoices,
}

/// Text generation backend. The returned text is opaque to the caller
/// apart from the empty check done by the reconciler.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable backend name for logs (e.g., "openai:gpt-4-turbo")
    fn name(&self) -> String;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}
