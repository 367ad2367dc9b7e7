//! Answer generator trait for the text-generation step.

use async_trait::async_trait;

use crate::error::Result;

/// A text-generation backend that turns a fully built prompt into an answer.
///
/// Each call is independent: a failed or timed-out call must not affect the
/// next one.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationTimeout`](crate::RagError::GenerationTimeout)
    /// when the backend does not answer in time and
    /// [`RagError::Generation`](crate::RagError::Generation) for any other failure.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Identifier of the generation model.
    fn model(&self) -> &str;
}
