//! Run configuration
//!
//! Settings are resolved once at startup from, in order of precedence:
//! command-line flags, environment variables, an optional TOML file and
//! built-in defaults. The resulting [`Settings`] is passed to every component;
//! nothing else reads the environment.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use llm::LlmConfig;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

const DEFAULT_MODELS: &str = "gpt-4.1,gpt-4o";
const DEFAULT_SEED: i64 = 42;
const DEFAULT_MIN_WORDS: usize = 15;
const DEFAULT_MAX_WORDS: usize = 40;
const DEFAULT_OUT_DIR: &str = "outputs";

/// Backend name that disables semantic scoring
pub const SEMANTIC_DISABLED: &str = "none";

/// Inclusive word-count window for synthesized contexts and answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBounds {
    pub min_words: usize,
    pub max_words: usize,
}

impl WordBounds {
    pub fn contains(&self, words: usize) -> bool {
        (self.min_words..=self.max_words).contains(&words)
    }
}

impl Default for WordBounds {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

/// Configuration flags shared by the runner commands
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// TOML config file
    #[arg(long, env = "FLUENT_EVAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// API base URL override
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,

    /// Comma-separated models under test
    #[arg(long, env = "MODEL_LIST")]
    pub models: Option<String>,

    /// Use this model for every fluent-context synthesis instead of the model under test
    #[arg(long, env = "MODEL_SUMMARIZER_FIXED")]
    pub summarizer_model: Option<String>,

    /// Seed sent with every completion request
    #[arg(long, env = "SEED")]
    pub seed: Option<i64>,

    /// Answer from the supplied context only (true/false, 1/0)
    #[arg(long, env = "STRICT_CONTEXT_ONLY", value_name = "BOOL", value_parser = parse_flag)]
    pub strict_context_only: Option<bool>,

    /// Embedding model for semantic similarity, or "none"
    #[arg(long, env = "SEMANTIC_BACKEND")]
    pub semantic_backend: Option<String>,

    /// Disable semantic similarity scoring
    #[arg(long)]
    pub no_semantic: bool,

    /// Minimum words per answer
    #[arg(long, env = "ANSWER_MIN_WORDS")]
    pub min_words: Option<usize>,

    /// Maximum words per answer
    #[arg(long, env = "ANSWER_MAX_WORDS")]
    pub max_words: Option<usize>,

    /// Base directory for result files
    #[arg(long, env = "OUT_DIR")]
    pub out_dir: Option<PathBuf>,

    /// Number of (model, example) pairs evaluated at once
    #[arg(long, env = "EVAL_CONCURRENCY")]
    pub concurrency: Option<usize>,
}

/// On-disk configuration; every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub models: Option<Vec<String>>,
    pub summarizer_model: Option<String>,
    pub seed: Option<i64>,
    pub strict_context_only: Option<bool>,
    pub semantic_backend: Option<String>,
    pub min_words: Option<usize>,
    pub max_words: Option<usize>,
    pub out_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
}

/// Fully resolved run settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmConfig,
    pub models: Vec<String>,
    pub summarizer_model: Option<String>,
    pub seed: i64,
    pub strict_context_only: bool,
    /// Embedding model name; `None` when semantic scoring is off
    pub semantic_backend: Option<String>,
    pub bounds: WordBounds,
    pub out_dir: PathBuf,
    pub concurrency: usize,
}

impl Settings {
    /// Resolve flags, reading the config file they name (if any)
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => load_file_config(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file)
    }

    /// Merge flags over file values over defaults and validate
    pub fn resolve(args: &ConfigArgs, file: FileConfig) -> Result<Self> {
        let api_key = non_blank(args.api_key.clone())
            .or_else(|| non_blank(file.api_key))
            .ok_or(EvalError::MissingCredential("OPENAI_API_KEY"))?;

        let models = match &args.models {
            Some(list) => parse_model_list(list),
            None => file
                .models
                .map(|m| m.into_iter().filter_map(|s| non_blank(Some(s))).collect())
                .unwrap_or_else(|| parse_model_list(DEFAULT_MODELS)),
        };
        if models.is_empty() {
            return Err(EvalError::InvalidConfig("model list is empty".to_string()));
        }

        let bounds = WordBounds {
            min_words: args.min_words.or(file.min_words).unwrap_or(DEFAULT_MIN_WORDS),
            max_words: args.max_words.or(file.max_words).unwrap_or(DEFAULT_MAX_WORDS),
        };
        if bounds.min_words == 0 || bounds.min_words > bounds.max_words {
            return Err(EvalError::InvalidConfig(format!(
                "word bounds must satisfy 1 <= min <= max (got {}..{})",
                bounds.min_words, bounds.max_words
            )));
        }

        let concurrency = args.concurrency.or(file.concurrency).unwrap_or(1);
        if concurrency == 0 {
            return Err(EvalError::InvalidConfig("concurrency must be at least 1".to_string()));
        }

        let semantic_backend = if args.no_semantic {
            None
        } else {
            let name = non_blank(args.semantic_backend.clone())
                .or_else(|| non_blank(file.semantic_backend))
                .unwrap_or_else(llm::default_embedding_model);
            (!name.eq_ignore_ascii_case(SEMANTIC_DISABLED)).then_some(name)
        };

        let mut llm = LlmConfig::new(api_key);
        llm.base_url = non_blank(args.base_url.clone()).or_else(|| non_blank(file.base_url));
        if let Some(model) = &semantic_backend {
            llm.embedding_model = model.clone();
        }

        Ok(Self {
            llm,
            models,
            summarizer_model: non_blank(args.summarizer_model.clone())
                .or_else(|| non_blank(file.summarizer_model)),
            seed: args.seed.or(file.seed).unwrap_or(DEFAULT_SEED),
            strict_context_only: args
                .strict_context_only
                .or(file.strict_context_only)
                .unwrap_or(true),
            semantic_backend,
            bounds,
            out_dir: args
                .out_dir
                .clone()
                .or(file.out_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            concurrency,
        })
    }
}

/// Load a TOML config file
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path).map_err(|source| EvalError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| EvalError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Split a comma-separated model list, dropping blanks
pub fn parse_model_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

/// Anything but 0/false/no/off (case-insensitive) is true
pub fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "0" | "false" | "no" | "off" => Ok(false),
        "" => Err("expected a boolean".to_string()),
        _ => Ok(true),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
