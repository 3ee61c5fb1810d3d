//! Language-model port for insight narration and text embedding.

use async_trait::async_trait;

use crate::error::BackendResult;

/// External literature/LLM provider.
///
/// Consumed only above the knowledge graph, for insight and hypothesis
/// narration. Callers must treat answers as advisory: every call site keeps a
/// deterministic non-AI fallback ([`crate::stubs::LexicalLanguageModel`]), so
/// a failing or absent provider degrades output quality, never correctness.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Answer a free-form prompt with text.
    async fn answer_query(&self, prompt: &str) -> BackendResult<String>;

    /// Embed text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> BackendResult<Vec<f32>>;
}
