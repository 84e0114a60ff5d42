//! Fluent vs. concatenated context evaluation
//!
//! Compares two ways of handing graph-path evidence to a model: the paths
//! linearized and concatenated, or the paths woven into a single fluent
//! sentence by a synthesis model. Each model answers every example from both
//! contexts and the answers are scored against gold references.
//!
//! ## Metrics
//!
//! - **ROUGE-1 / ROUGE-L**: unigram overlap and longest common subsequence
//! - **BLEU**: sentence BLEU over all references
//! - **Semantic F1**: embedding similarity, when a backend is available

pub mod answer;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod harness;
pub mod linearize;
pub mod loader;
pub mod metrics;
pub mod report;

pub use answer::{word_count, Answerer};
pub use config::{ConfigArgs, FileConfig, Settings, WordBounds};
pub use context::{final_line, FluentContextBuilder, INSUFFICIENT_CONTEXT};
pub use data::{builtin_examples, Edge, Example, Mode, Node, Path, ResultRow, Scores, SummaryRow};
pub use error::EvalError;
pub use harness::Harness;
pub use linearize::{concat_context, linearize_path};
pub use loader::{load_examples, parse_examples};
pub use metrics::{EmbeddingScorer, MetricScorer, SemanticScorer};
pub use report::{print_summary, save_json, summarize, timestamped_dir, write_csvs};
