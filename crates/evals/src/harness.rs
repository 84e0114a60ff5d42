//! Run orchestration
//!
//! For every (model, example) pair: build both contexts, answer from each,
//! score both answers and emit one row per mode. With a concurrency of 1
//! every service call runs in turn. Above that, pairs run through a bounded
//! stream and the two modes of a pair overlap; rows are re-sorted afterwards
//! so output order never depends on scheduling.

use std::sync::Arc;

use futures::{stream, StreamExt};
use llm::Completion;
use tracing::info;

use crate::answer::{word_count, Answerer};
use crate::config::{Settings, WordBounds};
use crate::context::FluentContextBuilder;
use crate::data::{Example, Mode, ResultRow, Scores};
use crate::linearize::concat_context;
use crate::metrics::MetricScorer;

/// Drives the completion service and scorer over models and examples
pub struct Harness {
    fluent: FluentContextBuilder,
    answerer: Answerer,
    scorer: Arc<MetricScorer>,
    summarizer_model: Option<String>,
    bounds: WordBounds,
    concurrency: usize,
}

impl Harness {
    pub fn new(llm: Arc<dyn Completion>, scorer: Arc<MetricScorer>, settings: &Settings) -> Self {
        Self {
            fluent: FluentContextBuilder::new(llm.clone(), settings.bounds, settings.seed),
            answerer: Answerer::new(llm, settings.bounds, settings.strict_context_only, settings.seed),
            scorer,
            summarizer_model: settings.summarizer_model.clone(),
            bounds: settings.bounds,
            concurrency: settings.concurrency.max(1),
        }
    }

    /// Evaluate one example on one model; returns the concat row then the fluent row
    pub async fn run_example(&self, model: &str, index: usize, example: &Example) -> [ResultRow; 2] {
        let concat_ctx = concat_context(&example.paths);
        let summarizer = self.summarizer_model.as_deref().unwrap_or(model);

        let concat = self.answerer.answer(&example.query, &concat_ctx, model);
        let fluent = async {
            let fluent_ctx = self.fluent.build(&example.query, &example.paths, summarizer).await;
            self.answerer.answer(&example.query, &fluent_ctx, model).await
        };
        // A concurrency of 1 issues every call one after another
        let (concat_answer, fluent_answer) = if self.sequential() {
            (concat.await, fluent.await)
        } else {
            tokio::join!(concat, fluent)
        };

        let concat_score = self.scorer.score(&concat_answer, &example.gold_refs);
        let fluent_score = self.scorer.score(&fluent_answer, &example.gold_refs);
        let (concat_scores, fluent_scores) = if self.sequential() {
            (concat_score.await, fluent_score.await)
        } else {
            tokio::join!(concat_score, fluent_score)
        };

        [
            self.row(model, Mode::Concat, index, example, concat_answer, concat_scores),
            self.row(model, Mode::Fluent, index, example, fluent_answer, fluent_scores),
        ]
    }

    fn sequential(&self) -> bool {
        self.concurrency == 1
    }

    fn row(
        &self,
        model: &str,
        mode: Mode,
        index: usize,
        example: &Example,
        answer: String,
        scores: Scores,
    ) -> ResultRow {
        let words = word_count(&answer);
        ResultRow {
            model: model.to_string(),
            mode,
            example_index: index,
            query: example.query.clone(),
            answer,
            scores,
            word_count: words,
            within_word_bounds: self.bounds.contains(words),
        }
    }

    /// Evaluate every example on every model
    ///
    /// Rows come back ordered by model (as listed), example index, then mode.
    pub async fn run(&self, models: &[String], examples: &[Example]) -> Vec<ResultRow> {
        let units: Vec<(usize, &str, usize, &Example)> = models
            .iter()
            .enumerate()
            .flat_map(|(mi, model)| {
                examples
                    .iter()
                    .enumerate()
                    .map(move |(ei, ex)| (mi, model.as_str(), ei, ex))
            })
            .collect();
        let total = units.len();

        info!(
            models = models.len(),
            examples = examples.len(),
            concurrency = self.concurrency,
            "starting evaluation"
        );

        let mut keyed: Vec<(usize, ResultRow)> = Vec::with_capacity(total * 2);
        let mut finished = std::pin::pin!(stream::iter(units)
            .map(|(mi, model, ei, ex)| async move {
                let rows = self.run_example(model, ei, ex).await;
                (mi, rows)
            })
            .buffer_unordered(self.concurrency));

        let mut done = 0;
        while let Some((mi, rows)) = finished.next().await {
            done += 1;
            for row in &rows {
                info!(
                    "[{}/{}] {} {} #{} R1={:.4} RL={:.4} BLEU={:.4} SEM={:.4}",
                    done,
                    total,
                    row.model,
                    row.mode,
                    row.example_index + 1,
                    row.scores.rouge1,
                    row.scores.rouge_l,
                    row.scores.bleu,
                    row.scores.semantic_f1
                );
            }
            keyed.extend(rows.into_iter().map(|row| (mi, row)));
        }

        keyed.sort_by(|(ma, a), (mb, b)| {
            (ma, a.example_index, a.mode).cmp(&(mb, b.example_index, b.mode))
        });
        keyed.into_iter().map(|(_, row)| row).collect()
    }
}
