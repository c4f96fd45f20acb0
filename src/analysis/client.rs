use async_trait::async_trait;
use thiserror::Error;

use super::{OllamaClient, OpenAiClient};
use crate::config::{AnalysisProvider, Config};

/// Errors surfaced by completion providers.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Provider is disabled, misconfigured, or unreachable.
    #[error("Completion provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider refused the request in a way retrying cannot fix (authentication, bad request).
    #[error("Completion request rejected: {0}")]
    Rejected(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Request passed to a completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instruction framing the assistant's role.
    pub system: String,
    /// User prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens in the answer.
    pub max_tokens: u32,
}

/// Interface implemented by language-model providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produce the assistant's answer to `request`.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

/// Build the completion client selected by configuration; `None` means extractive analysis.
pub fn build_completion_client(
    config: &Config,
) -> Result<Option<Box<dyn CompletionClient>>, CompletionError> {
    match config.analysis_provider {
        AnalysisProvider::None => Ok(None),
        AnalysisProvider::OpenAI => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                CompletionError::ProviderUnavailable("OPENAI_API_KEY is not set".into())
            })?;
            let client = OpenAiClient::new(
                config.openai_base_url.clone(),
                api_key,
                config.llm_model.clone(),
            )?
            .with_retry_policy(
                config.max_retries,
                std::time::Duration::from_secs(config.retry_delay_secs),
            );
            tracing::info!(model = %config.llm_model, "OpenAI client initialized");
            Ok(Some(Box::new(client)))
        }
        AnalysisProvider::Ollama => {
            let client = OllamaClient::new(config.ollama_url.clone(), config.llm_model.clone())?;
            tracing::info!(model = %config.llm_model, url = %config.ollama_url, "Ollama client initialized");
            Ok(Some(Box::new(client)))
        }
    }
}
