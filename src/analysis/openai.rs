//! OpenAI chat-completions adapter with fixed-delay retries.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::client::{CompletionClient, CompletionError, CompletionRequest};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Construct a client for `model` at `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self, CompletionError> {
        let http = Client::builder()
            .user_agent("paperdigest/openai")
            .build()
            .map_err(|error| {
                CompletionError::ProviderUnavailable(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self {
            http,
            base_url,
            api_key,
            model,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Override how many attempts are made and how long to wait between them.
    pub fn with_retry_policy(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn complete_once(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                CompletionError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("OpenAI returned {status}: {body}");
            return Err(
                if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                    CompletionError::Rejected(message)
                } else {
                    CompletionError::GenerationFailed(message)
                },
            );
        }

        let body: ChatResponse = response.json().await.map_err(|error| {
            CompletionError::InvalidResponse(format!("failed to decode OpenAI response: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| CompletionError::InvalidResponse("response carried no content".into()))
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let mut attempt = 1;
        loop {
            tracing::debug!(attempt, max_retries = self.max_retries, model = %self.model, "Calling OpenAI");
            match self.complete_once(&request).await {
                Ok(content) => return Ok(content),
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    tracing::warn!(
                        attempt,
                        error = %error,
                        delay_secs = self.retry_delay.as_secs(),
                        "Completion failed; retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(attempt, error = %error, "Completion failed");
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "You analyze papers.".into(),
            prompt: "Analyze this".into(),
            temperature: 0.2,
            max_tokens: 100,
        }
    }

    fn client(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(server.base_url(), "sk-test".into(), "gpt-4".into())
            .expect("client")
            .with_retry_policy(2, Duration::ZERO)
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .json_body_partial(r#"{"model": "gpt-4", "max_tokens": 100}"#);
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "  {\"summary\": \"ok\"} " } }]
                }));
            })
            .await;

        let content = client(&server).complete(request()).await.expect("content");
        mock.assert_async().await;
        assert_eq!(content, "{\"summary\": \"ok\"}");
    }

    #[tokio::test]
    async fn retries_server_errors_until_budget_exhausted() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(503).body("overloaded");
            })
            .await;

        let error = client(&server).complete(request()).await.unwrap_err();
        mock.assert_hits_async(2).await;
        assert!(matches!(error, CompletionError::GenerationFailed(message) if message.contains("503")));
    }

    #[tokio::test]
    async fn does_not_retry_rejected_requests() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(401).body("bad key");
            })
            .await;

        let error = client(&server).complete(request()).await.unwrap_err();
        mock.assert_hits_async(1).await;
        assert!(matches!(error, CompletionError::Rejected(_)));
    }

    #[tokio::test]
    async fn empty_choices_are_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let error = client(&server).complete(request()).await.unwrap_err();
        assert!(matches!(error, CompletionError::InvalidResponse(_)));
    }
}
