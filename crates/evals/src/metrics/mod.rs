//! Answer scoring against multiple gold references
//!
//! - **ROUGE-1 / ROUGE-L**: best F-measure over references
//! - **BLEU**: sentence BLEU with all references at once
//! - **Semantic F1**: best embedding similarity over references; 0.0 when no
//!   backend is configured
//!
//! Scoring never fails. Anything a metric cannot compute counts as 0.0.

pub mod bleu;
pub mod rouge;
pub mod semantic;

use std::sync::Arc;

use tracing::debug;

use crate::data::Scores;

pub use bleu::sentence_bleu;
pub use rouge::{RougeScorer, RougeScores};
pub use semantic::{EmbeddingScorer, SemanticScorer};

pub struct MetricScorer {
    rouge: RougeScorer,
    semantic: Option<Arc<dyn SemanticScorer>>,
}

impl MetricScorer {
    pub fn new(semantic: Option<Arc<dyn SemanticScorer>>) -> Self {
        Self {
            rouge: RougeScorer::new(),
            semantic,
        }
    }

    /// Lexical metrics only
    pub fn lexical() -> Self {
        Self::new(None)
    }

    pub fn has_semantic(&self) -> bool {
        self.semantic.is_some()
    }

    pub async fn score(&self, hypothesis: &str, references: &[String]) -> Scores {
        let rouge = self.rouge.best(hypothesis, references);

        Scores {
            rouge1: finite_or_zero(rouge.rouge1),
            rouge_l: finite_or_zero(rouge.rouge_l),
            bleu: finite_or_zero(sentence_bleu(hypothesis, references)),
            semantic_f1: self.semantic_best(hypothesis, references).await,
        }
    }

    async fn semantic_best(&self, hypothesis: &str, references: &[String]) -> f64 {
        let Some(scorer) = &self.semantic else {
            return 0.0;
        };

        match scorer.score(hypothesis, references).await {
            Ok(scores) => scores
                .into_iter()
                .map(finite_or_zero)
                .fold(0.0, f64::max),
            Err(e) => {
                debug!("semantic scoring failed, counting 0.0: {:#}", e);
                0.0
            }
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
