// src/llm/embeddings.rs
// Embedding provider trait - embedding backends are external collaborators

use async_trait::async_trait;

use crate::error::Result;

/// Dense-vector embedding provider.
///
/// `dimensions()` is a constant per provider instance; callers must ensure the
/// store's vector columns were created with the same dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Fixed output dimension of this provider
    fn dimensions(&self) -> usize;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
