//! ROUGE-1 and ROUGE-L F-measures
//!
//! Tokenization matches `rouge-score`: lowercase, every run of characters
//! outside `[a-z0-9]` is a separator, and tokens longer than three
//! characters are stemmed. Stemming uses Snowball English (Porter2) rather
//! than the original Porter algorithm `rouge-score` ships, so a few stems
//! differ ("generalization" stays "general" instead of "gener") and scores
//! can deviate slightly from the Python package.

use std::collections::HashMap;

use rust_stemmers::{Algorithm, Stemmer};

/// ROUGE-1 and ROUGE-L F-measures for one pair or best-of-N
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RougeScores {
    pub rouge1: f64,
    pub rouge_l: f64,
}

pub struct RougeScorer {
    stemmer: Stemmer,
}

impl Default for RougeScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl RougeScorer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
            .filter(|t| !t.is_empty())
            .map(|t| {
                if t.len() > 3 {
                    self.stemmer.stem(t).into_owned()
                } else {
                    t.to_string()
                }
            })
            .collect()
    }

    /// Score a hypothesis against a single reference
    pub fn score(&self, reference: &str, hypothesis: &str) -> RougeScores {
        let target = self.tokenize(reference);
        let prediction = self.tokenize(hypothesis);

        RougeScores {
            rouge1: unigram_f(&target, &prediction),
            rouge_l: lcs_f(&target, &prediction),
        }
    }

    /// Maximum of each measure over all references
    pub fn best(&self, hypothesis: &str, references: &[String]) -> RougeScores {
        let prediction = self.tokenize(hypothesis);

        references.iter().fold(RougeScores::default(), |best, reference| {
            let target = self.tokenize(reference);
            RougeScores {
                rouge1: best.rouge1.max(unigram_f(&target, &prediction)),
                rouge_l: best.rouge_l.max(lcs_f(&target, &prediction)),
            }
        })
    }
}

fn f_measure(overlap: usize, target_len: usize, prediction_len: usize) -> f64 {
    if target_len == 0 || prediction_len == 0 {
        return 0.0;
    }
    let precision = overlap as f64 / prediction_len as f64;
    let recall = overlap as f64 / target_len as f64;
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

fn unigram_f(target: &[String], prediction: &[String]) -> f64 {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in target {
        *counts.entry(token.as_str()).or_default() += 1;
    }

    let mut overlap = 0;
    for token in prediction {
        if let Some(remaining) = counts.get_mut(token.as_str()) {
            if *remaining > 0 {
                *remaining -= 1;
                overlap += 1;
            }
        }
    }

    f_measure(overlap, target.len(), prediction.len())
}

fn lcs_f(target: &[String], prediction: &[String]) -> f64 {
    f_measure(lcs_len(target, prediction), target.len(), prediction.len())
}

/// Longest common subsequence length, two-row dynamic programming
fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
