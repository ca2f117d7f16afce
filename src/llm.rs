//! Text-completion client and the guarded call helper.
//!
//! [`CompletionClient`] is the seam to the external model service;
//! [`OpenAiCompatibleClient`] talks to any `/chat/completions` endpoint
//! (GLM, Groq, Ollama, ...). Pipeline code never calls a client directly: it
//! goes through [`LlmGateway`], which bounds every attempt with a timeout,
//! retries failures a fixed number of times, and folds the outcome into the
//! tagged [`LlmReply`] so callers can fall back without handling errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{PipelineError, Result};
use crate::metrics::PipelineMetrics;

/// Connection timeout for the HTTP client; whole-call budgets live in the gateway
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Role of a prompt turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions
    System,
    /// End-user content
    User,
    /// Prior model output
    Assistant,
}

/// One turn sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Turn author
    pub role: ChatRole,
    /// Turn text
    pub content: String,
}

impl ChatMessage {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A single non-streaming completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// System prompt
    pub system_prompt: String,
    /// Conversation turns after the system prompt
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    /// A request consisting of a system prompt and one user turn
    pub fn new(system_prompt: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: vec![ChatMessage::user(user_content)],
        }
    }
}

/// External text-completion service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the model's text reply to `request`
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

// ============================================================================
// OpenAI-compatible HTTP client
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleClient {
    /// Build a client from configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Full URL requests are posted to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> OpenAiRequest<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(OpenAiMessage {
            role: ChatRole::System,
            content: &request.system_prompt,
        });
        messages.extend(request.messages.iter().map(|m| OpenAiMessage {
            role: m.role,
            content: &m.content,
        }));

        OpenAiRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.build_body(request);

        let mut builder = self.http.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Llm(format!("{status}: {}", crate::utils::preview(&text))));
        }

        let parsed: OpenAiResponse = response.json().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

// ============================================================================
// Guarded calls
// ============================================================================

/// Outcome of a guarded model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmReply {
    /// Non-blank reply text
    Text(String),
    /// The model answered with nothing (or only whitespace)
    Empty,
    /// Every attempt failed or timed out
    Unavailable(String),
}

/// Timeout + retry wrapper shared by every model call site
#[derive(Clone)]
pub struct LlmGateway {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl LlmGateway {
    /// Wrap `client` with explicit limits
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            client,
            timeout,
            max_retries,
            retry_backoff,
        }
    }

    /// Wrap `client` with the limits from configuration
    pub fn from_config(client: Arc<dyn CompletionClient>, config: &LlmConfig) -> Self {
        Self::new(
            client,
            config.timeout(),
            config.max_retries,
            config.backoff(1),
        )
    }

    /// Run `request`, never failing: errors and timeouts become `Unavailable`
    pub async fn complete(&self, request: &CompletionRequest) -> LlmReply {
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.retry_backoff * attempt).await;
                debug!(attempt, "Retrying LLM call");
            }

            let started = Instant::now();
            match tokio::time::timeout(self.timeout, self.client.complete(request)).await {
                Ok(Ok(text)) if text.trim().is_empty() => {
                    PipelineMetrics::record_llm_call("empty", started.elapsed());
                    return LlmReply::Empty;
                }
                Ok(Ok(text)) => {
                    PipelineMetrics::record_llm_call("ok", started.elapsed());
                    return LlmReply::Text(text);
                }
                Ok(Err(e)) => {
                    PipelineMetrics::record_llm_call("error", started.elapsed());
                    warn!(attempt, error = %e, "LLM call failed");
                    last_error = e.to_string();
                }
                Err(_) => {
                    PipelineMetrics::record_llm_call("timeout", started.elapsed());
                    let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                    warn!(attempt, timeout_ms, "LLM call timed out");
                    last_error = PipelineError::Timeout(timeout_ms).to_string();
                }
            }
        }

        LlmReply::Unavailable(last_error)
    }
}
