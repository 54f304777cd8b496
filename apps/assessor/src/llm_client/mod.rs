/// LLM Client: the single point of entry for all chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the model endpoint directly.
/// All LLM interactions MUST go through `LlmClient`, which owns the retry,
/// backoff and pacing behavior. Backends only perform a single attempt.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Failure of a single attempt against the endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Raised only once every attempt allowed by the `RetryPolicy` has failed.
#[derive(Debug, Error)]
#[error("Model call failed after {attempts} attempts: {source}")]
pub struct ModelCallError {
    pub attempts: u32,
    pub source: LlmError,
}

/// One logical chat-completion request: a system and a user instruction.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A transport that performs exactly one attempt. Swap implementations
/// (HTTP, scripted test double) without touching the retry logic.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible HTTP backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatCompletionResponse {
    /// Content of the first choice. A missing choice or null content is an
    /// empty string, not an error.
    pub fn text(&self) -> &str {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Chat Completions API backend (`POST {base_url}/chat/completions`).
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model: request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&text)?;
        if let Some(usage) = &completion.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(completion.text().to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Retrying client
// ────────────────────────────────────────────────────────────────────────────

/// Attempt cap, backoff curve and post-success pacing.
///
/// The delay after failed attempt `n` (1-based) is
/// `backoff_base^(n-1)` seconds plus `n * attempt_step`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: f64,
    pub attempt_step: Duration,
    /// Slept after every successful call to stay under upstream rate limits.
    pub pacing: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: 1.5,
            attempt_step: Duration::from_millis(100),
            pacing: Duration::from_millis(600),
        }
    }
}

impl RetryPolicy {
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        Duration::from_secs_f64(self.backoff_base.powi(exponent)) + self.attempt_step * attempt
    }
}

/// The single LLM client used by the assessment pipeline.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn ChatBackend>,
    policy: RetryPolicy,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn ChatBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Makes one logical call, retrying every failure with backoff until the
    /// attempt cap. An empty completion is returned as `Ok("")`.
    pub async fn call(&self, request: &ChatRequest<'_>) -> Result<String, ModelCallError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.backend.complete(request).await {
                Ok(text) => {
                    tokio::time::sleep(self.policy.pacing).await;
                    return Ok(text);
                }
                Err(err) if attempt >= max_attempts => {
                    warn!("LLM call attempt {attempt}/{max_attempts} failed: {err}");
                    return Err(ModelCallError {
                        attempts: max_attempts,
                        source: err,
                    });
                }
                Err(err) => {
                    let delay = self.policy.backoff_delay(attempt);
                    warn!(
                        "LLM call attempt {}/{} failed, retrying after {}ms: {}",
                        attempt,
                        max_attempts,
                        delay.as_millis(),
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
