//! Constrained answering
//!
//! One declarative sentence inside a word window, grounded in the supplied
//! context. Compliance with the window is measured downstream, not enforced.

use std::sync::Arc;

use llm::{ChatOptions, Completion, Message};

use crate::config::WordBounds;
use crate::context::INSUFFICIENT_CONTEXT;

const ANSWER_MAX_TOKENS: u32 = 160;

/// Answers a query from a context string
pub struct Answerer {
    llm: Arc<dyn Completion>,
    bounds: WordBounds,
    strict_context_only: bool,
    seed: i64,
}

impl Answerer {
    pub fn new(llm: Arc<dyn Completion>, bounds: WordBounds, strict_context_only: bool, seed: i64) -> Self {
        Self {
            llm,
            bounds,
            strict_context_only,
            seed,
        }
    }

    /// Ask `model` to answer `query` from `context`; returns the trimmed completion
    pub async fn answer(&self, query: &str, context: &str, model: &str) -> String {
        let options = ChatOptions::new(model)
            .max_tokens(ANSWER_MAX_TOKENS)
            .seed(self.seed);

        let reply = self
            .llm
            .complete(
                vec![
                    Message::system(self.system_prompt()),
                    Message::user(self.build_prompt(query, context)),
                ],
                &options,
            )
            .await;

        reply.trim().to_string()
    }

    fn system_prompt(&self) -> String {
        let mut prompt = String::from("You are a careful QA assistant.");
        if self.strict_context_only {
            prompt.push_str(&format!(
                " Use ONLY the facts in the supplied context. If insufficient, respond exactly: {INSUFFICIENT_CONTEXT}"
            ));
        }
        prompt
    }

    fn build_prompt(&self, query: &str, context: &str) -> String {
        let min_words = self.bounds.min_words;
        let max_words = self.bounds.max_words;

        format!(
            r#"Context:
"""{context}"""

Question: {query}

Instructions:
- Write EXACTLY ONE well-formed English sentence between {min_words} and {max_words} words.
- No lists/bullets; no quotations; declarative tone.
- If the answer isn't derivable from the context, reply exactly: {INSUFFICIENT_CONTEXT}"#
        )
    }
}

/// Whitespace-delimited word count
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
