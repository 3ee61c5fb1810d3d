//! Deterministic lexical fallback for the language-model port.

use async_trait::async_trait;
use tracing::debug;

use crate::error::BackendResult;
use crate::ports::LanguageModel;

/// Dimension of embeddings produced by [`LexicalLanguageModel`].
pub const EMBEDDING_DIM: usize = 64;

/// Template-and-hash fallback [`LanguageModel`].
///
/// Answers are built from the prompt's salient tokens; embeddings are
/// L2-normalized hashed bag-of-words vectors. Identical input always yields
/// identical output, which is the property insight generation needs when no
/// external provider is configured.
#[derive(Debug, Default)]
pub struct LexicalLanguageModel;

impl LexicalLanguageModel {
    /// Create the fallback model.
    pub fn new() -> Self {
        Self
    }

    /// Lowercased alphanumeric tokens of length >= 3.
    fn tokens(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= 3)
            .map(str::to_owned)
            .collect()
    }

    /// FNV-1a over the token bytes; stable across processes, unlike the
    /// std `DefaultHasher`.
    fn fnv1a(token: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }
}

#[async_trait]
impl LanguageModel for LexicalLanguageModel {
    async fn answer_query(&self, prompt: &str) -> BackendResult<String> {
        let tokens = Self::tokens(prompt);
        debug!(tokens = tokens.len(), "lexical model answering query");

        if tokens.is_empty() {
            return Ok("No analyzable terms in the query.".to_string());
        }

        // Pick the longest tokens as the salient terms; longest-first, then
        // alphabetical so the answer is stable regardless of input order.
        let mut salient = tokens.clone();
        salient.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        salient.dedup();
        salient.truncate(5);

        Ok(format!(
            "Based on the available literature, the most relevant factors are: {}.",
            salient.join(", ")
        ))
    }

    async fn embed(&self, text: &str) -> BackendResult<Vec<f32>> {
        let mut vector = vec![0.0f32; EMBEDDING_DIM];
        for token in Self::tokens(text) {
            let bucket = (Self::fnv1a(&token) % EMBEDDING_DIM as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_are_deterministic() {
        let model = LexicalLanguageModel::new();
        let a = model
            .answer_query("What limits power density in microbial fuel cells?")
            .await
            .expect("answer");
        let b = model
            .answer_query("What limits power density in microbial fuel cells?")
            .await
            .expect("answer");
        assert_eq!(a, b);
        assert!(a.contains("microbial"));
    }

    #[tokio::test]
    async fn embeddings_are_unit_length() {
        let model = LexicalLanguageModel::new();
        let v = model.embed("electrode biofilm conductivity").await.expect("embed");
        assert_eq!(v.len(), EMBEDDING_DIM);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let model = LexicalLanguageModel::new();
        let v = model.embed("").await.expect("embed");
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
