//! Fluent context synthesis
//!
//! Asks a model to weave graph paths into a single faithful sentence. The
//! model is told to think in sections (must-keep phrases, facts, a synthesis
//! plan) and put the finished sentence on its last line; only that line is
//! used as context.

use std::sync::Arc;

use llm::{ChatOptions, Completion, Message};
use tracing::debug;

use crate::config::WordBounds;
use crate::data::Path;
use crate::linearize::linearize_path;

/// Sentinel the model must answer with when the evidence cannot support a sentence
pub const INSUFFICIENT_CONTEXT: &str = "Insufficient context.";

const FLUENT_MAX_TOKENS: u32 = 360;

/// Builds the `fluent` context for one example
pub struct FluentContextBuilder {
    llm: Arc<dyn Completion>,
    bounds: WordBounds,
    seed: i64,
}

impl FluentContextBuilder {
    pub fn new(llm: Arc<dyn Completion>, bounds: WordBounds, seed: i64) -> Self {
        Self { llm, bounds, seed }
    }

    /// Synthesize a context sentence for `query` from `paths` using `model`
    pub async fn build(&self, query: &str, paths: &[Path], model: &str) -> String {
        let prompt = self.build_prompt(query, paths);
        let options = ChatOptions::new(model)
            .max_tokens(FLUENT_MAX_TOKENS)
            .seed(self.seed);

        let raw = self
            .llm
            .complete(
                vec![Message::system(WEAVER_SYSTEM_PROMPT), Message::user(prompt)],
                &options,
            )
            .await;
        debug!(model, lines = raw.lines().count(), "fluent synthesis returned");

        final_line(&raw).to_string()
    }

    fn build_prompt(&self, query: &str, paths: &[Path]) -> String {
        let evidence = paths
            .iter()
            .map(|p| format!("- {}", linearize_path(p)))
            .collect::<Vec<_>>()
            .join("\n");
        let min_words = self.bounds.min_words;
        let max_words = self.bounds.max_words;
        let aim_low = min_words.max(max_words.saturating_sub(8));

        format!(
            r#"Question: {query}

Evidence chains (paths), formatted as [NodeID] text --relation→ [NodeID] text:
{evidence}

TASK (follow strictly)
1) Must-keep phrases (copy verbatim; 6–12 short spans): names, numerals/dates, places, technical terms.
2) Facts: concise bullets using original surface forms when possible.
3) Synthesis (1 sentence): order facts so the answer is obvious using explicit connectors.
4) FINAL: On the LAST line, write ONE standalone English sentence of {min_words}–{max_words} words (aim for {aim_low}–{max_words}). No quotes/lists/meta.
If evidence is insufficient, output exactly: {INSUFFICIENT_CONTEXT}

FORMAT (exactly; last line must be only the final sentence):
Must-keep phrases:
- ...
Facts:
- ...
Synthesis: <one sentence here>
<final answer sentence here>"#
        )
    }
}

/// The last non-blank line of a model response.
///
/// A response without line breaks is returned whole (trimmed); an empty
/// response yields an empty string.
pub fn final_line(raw: &str) -> &str {
    raw.trim()
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

const WEAVER_SYSTEM_PROMPT: &str = "You are an Evidence Weaver for multi-hop QA.
You transform graph-path evidence into an answer-ready context while remaining 100% faithful.
Optimization goal: maximize lexical overlap with relevant evidence while avoiding any invented facts.";
