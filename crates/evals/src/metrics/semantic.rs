//! Embedding-based semantic similarity

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use llm::Embedder;

/// A semantic similarity backend
///
/// Returns one similarity in [0, 1] per reference, in reference order.
#[async_trait]
pub trait SemanticScorer: Send + Sync {
    async fn score(&self, hypothesis: &str, references: &[String]) -> Result<Vec<f64>>;
}

/// Cosine similarity between embedding vectors, clamped to [0, 1]
pub struct EmbeddingScorer {
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Check that the backend answers at all
    pub async fn probe(&self) -> Result<()> {
        let vectors = self
            .embedder
            .embed(vec!["probe".to_string()])
            .await
            .context("Embedding backend did not respond")?;
        match vectors.first() {
            Some(v) if !v.is_empty() => Ok(()),
            _ => anyhow::bail!("Embedding backend returned no vectors"),
        }
    }
}

#[async_trait]
impl SemanticScorer for EmbeddingScorer {
    async fn score(&self, hypothesis: &str, references: &[String]) -> Result<Vec<f64>> {
        if hypothesis.trim().is_empty() || references.is_empty() {
            return Ok(vec![0.0; references.len()]);
        }

        let mut texts = Vec::with_capacity(references.len() + 1);
        texts.push(hypothesis.to_string());
        texts.extend(references.iter().cloned());

        let vectors = self.embedder.embed(texts).await?;
        if vectors.len() != references.len() + 1 {
            anyhow::bail!(
                "expected {} embeddings, got {}",
                references.len() + 1,
                vectors.len()
            );
        }

        let (hyp, refs) = vectors.split_first().context("no hypothesis embedding")?;
        Ok(refs.iter().map(|r| cosine(hyp, r).clamp(0.0, 1.0)).collect())
    }
}

pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
