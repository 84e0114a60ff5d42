//! LLM client abstraction for the evaluation harness
//!
//! Wraps the OpenAI chat and embedding endpoints behind two small traits:
//! [`Completion`] never fails (client errors come back as an error-sentinel
//! string) and [`Embedder`] returns ordinary results.

use anyhow::{Context, Result};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs, EmbeddingInput,
    },
    Client as OpenAIClient,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Prefix of every error-sentinel completion.
pub const ERROR_SENTINEL_PREFIX: &str = "[ERROR:";

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key
    pub api_key: String,
    /// Base URL override (for custom endpoints)
    pub base_url: Option<String>,
    /// Model to use for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

pub fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            embedding_model: default_embedding_model(),
        }
    }
}

/// A message in a chat conversation
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-request generation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub seed: Option<i64>,
}

impl ChatOptions {
    /// Deterministic defaults: temperature 0, 300 output tokens, no seed
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            max_tokens: 300,
            seed: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Text-completion service.
///
/// Implementations must not fail: any transport, auth or API error is
/// returned as `[ERROR: <kind>: <message>]` so callers can treat it as text.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, messages: Vec<Message>, options: &ChatOptions) -> String;
}

/// Text embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Whether a completion is an error sentinel rather than model output
pub fn is_error_sentinel(text: &str) -> bool {
    text.starts_with(ERROR_SENTINEL_PREFIX)
}

/// Render an error as `[ERROR: <kind>: <message>]`
pub fn error_sentinel(err: &anyhow::Error) -> String {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<OpenAIError>())
        .map(openai_error_kind)
        .unwrap_or("Error");
    let message = err.root_cause().to_string().replace('\n', " ");
    format!("{ERROR_SENTINEL_PREFIX} {kind}: {message}]")
}

fn openai_error_kind(err: &OpenAIError) -> &'static str {
    match err {
        OpenAIError::Reqwest(_) => "Reqwest",
        OpenAIError::ApiError(_) => "ApiError",
        OpenAIError::JSONDeserialize(_) => "JSONDeserialize",
        OpenAIError::FileSaveError(_) => "FileSaveError",
        OpenAIError::FileReadError(_) => "FileReadError",
        OpenAIError::StreamError(_) => "StreamError",
        OpenAIError::InvalidArgument(_) => "InvalidArgument",
        #[allow(unreachable_patterns)]
        _ => "OpenAIError",
    }
}

/// OpenAI-backed LLM client
#[derive(Clone)]
pub struct LlmClient {
    client: OpenAIClient<OpenAIConfig>,
    embedding_model: String,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration
    pub fn new(config: LlmConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: OpenAIClient::with_config(openai_config),
            embedding_model: config.embedding_model,
        }
    }

    /// Generate a chat completion
    pub async fn chat(&self, messages: Vec<Message>, options: &ChatOptions) -> Result<String> {
        let openai_messages = messages
            .into_iter()
            .map(to_openai_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&options.model)
            .messages(openai_messages)
            .temperature(options.temperature)
            .max_tokens(options.max_tokens);
        if let Some(seed) = options.seed {
            args.seed(seed);
        }
        let request = args
            .build()
            .context("Failed to build chat completion request")?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .context("Failed to create chat completion")?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }

    /// Generate embeddings for a list of texts
    pub async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embedding_model)
            .input(EmbeddingInput::StringArray(texts))
            .build()
            .context("Failed to build embedding request")?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .context("Failed to create embeddings")?;

        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }

    /// Get the configured embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

fn to_openai_message(msg: Message) -> Result<ChatCompletionRequestMessage> {
    let message = match msg.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(msg.content)
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(msg.content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(msg.content)
            .build()?
            .into(),
    };
    Ok(message)
}

#[async_trait]
impl Completion for LlmClient {
    async fn complete(&self, messages: Vec<Message>, options: &ChatOptions) -> String {
        match self.chat(messages, options).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::debug!(model = %options.model, "completion failed: {:#}", e);
                error_sentinel(&e)
            }
        }
    }
}

#[async_trait]
impl Embedder for LlmClient {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.embed_texts(texts).await
    }
}
