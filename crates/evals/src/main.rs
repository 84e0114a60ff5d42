//! Fluent context evaluation runner
//!
//! Answers every example with every configured model from both contexts,
//! scores the answers and writes the result tables.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use fluent_evals::{
    builtin_examples, concat_context, load_examples, print_summary, save_json, summarize,
    timestamped_dir, write_csvs, ConfigArgs, EmbeddingScorer, Example, Harness, MetricScorer,
    SemanticScorer, Settings,
};

#[derive(Parser)]
#[command(name = "fluent-eval")]
#[command(about = "Compare fluent and concatenated graph-path contexts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the evaluation and write result files
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// TOML file with examples (defaults to the built-in set)
        #[arg(short, long, env = "FLUENT_EVAL_EXAMPLES")]
        examples: Option<PathBuf>,

        /// Also save rows and summaries with exact values as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the examples that would be evaluated
    List {
        /// TOML file with examples (defaults to the built-in set)
        #[arg(short, long, env = "FLUENT_EVAL_EXAMPLES")]
        examples: Option<PathBuf>,

        /// Print the concatenated context for each example
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            examples,
            json,
        } => run_eval(&config, examples.as_ref(), json).await,
        Commands::List { examples, verbose } => list_examples(examples.as_ref(), verbose),
    }
}

async fn run_eval(args: &ConfigArgs, examples_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let settings = Settings::load(args)?;
    let examples = get_examples(examples_path)?;

    let client = llm::LlmClient::new(settings.llm.clone());
    let scorer = Arc::new(MetricScorer::new(semantic_backend(&settings, &client).await));

    println!(
        "Evaluating {} example(s) on {} model(s): {}",
        examples.len(),
        settings.models.len(),
        settings.models.join(", ")
    );
    if let Some(model) = &settings.summarizer_model {
        println!("Fluent contexts synthesized by: {}", model);
    }
    println!();

    let harness = Harness::new(Arc::new(client), scorer, &settings);
    let rows = harness.run(&settings.models, &examples).await;
    let summaries = summarize(&rows);

    let out_dir = timestamped_dir(&settings.out_dir);
    let files = write_csvs(&rows, &summaries, &out_dir).context("Failed to write results")?;
    if json {
        let path = save_json(&rows, &summaries, &out_dir)?;
        info!("Saved JSON results to {}", path.display());
    }

    print_summary(&summaries);
    println!("Saved: {}", files.detail.display());
    println!("Saved: {}", files.summary.display());

    Ok(())
}

/// The semantic scorer for this run, or `None` when disabled or unreachable
async fn semantic_backend(
    settings: &Settings,
    client: &llm::LlmClient,
) -> Option<Arc<dyn SemanticScorer>> {
    if settings.semantic_backend.is_none() {
        warn!("Semantic scoring disabled; bertscore_f1 will be 0.0");
        return None;
    }

    let scorer = EmbeddingScorer::new(Arc::new(client.clone()));
    match scorer.probe().await {
        Ok(()) => {
            info!(model = client.embedding_model(), "Semantic scoring enabled");
            Some(Arc::new(scorer))
        }
        Err(e) => {
            warn!("Semantic backend unavailable ({:#}); bertscore_f1 will be 0.0", e);
            None
        }
    }
}

fn list_examples(examples_path: Option<&PathBuf>, verbose: bool) -> Result<()> {
    let examples = get_examples(examples_path)?;
    println!("Available examples:\n");
    for (i, example) in examples.iter().enumerate() {
        println!("  {}. {}", i + 1, example.query);
        println!("    Paths: {}", example.paths.len());
        println!("    References: {}", example.gold_refs.len());
        if verbose {
            for line in concat_context(&example.paths).lines() {
                println!("      {}", line);
            }
        }
        println!();
    }
    Ok(())
}

/// Load examples from a file (if provided) or use the built-in set
fn get_examples(examples_path: Option<&PathBuf>) -> Result<Vec<Example>> {
    match examples_path {
        Some(path) => {
            println!("Loading examples from: {}", path.display());
            let examples = load_examples(path)?;
            if examples.is_empty() {
                anyhow::bail!("No examples found in {}", path.display());
            }
            Ok(examples)
        }
        None => Ok(builtin_examples()),
    }
}
