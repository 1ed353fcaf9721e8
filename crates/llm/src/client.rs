//! Chat-completions client.

use async_trait::async_trait;
use pipeline::{GenerationError, GenerationRequest, ModelName, TextGenerator};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::retry::{classify_status, classify_transport, retry_delay};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`TextGenerator`] backed by an OpenAI-compatible `/chat/completions` endpoint.
///
/// Rate limits, transport failures and 5xx answers are retried up to
/// `max_attempts` times, waiting `2^attempt` seconds between attempts or the
/// server's `Retry-After` when it sends one.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    http: reqwest::Client,
    model: ModelName,
    config: LlmConfig,
}

impl OpenAiGenerator {
    /// Builds a client with the configured per-request timeout.
    ///
    /// # Errors
    ///
    /// [`GenerationError::Configuration`] when the API key or model name is
    /// empty, or the HTTP client cannot be constructed.
    pub fn new(config: LlmConfig) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::Configuration {
                message: "API key is not set".to_string(),
            });
        }
        let model = ModelName::new(config.model.trim()).ok_or_else(|| {
            GenerationError::Configuration {
                message: "model name is empty".to_string(),
            }
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GenerationError::Configuration {
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            model,
            config,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn build_body<'a>(&'a self, request: &'a GenerationRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &self.config.model,
            messages,
            temperature: request.temperature.unwrap_or(self.config.temperature),
            max_tokens: self.config.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }

    async fn send_once(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let response = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &headers, body));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| classify_transport(&e))?;
        extract_content(parsed)
    }
}

fn extract_content(response: ChatResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| GenerationError::MalformedResponse {
            message: "response contained no message content".to_string(),
        })
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Ok(content) => {
                    debug!(
                        model = %self.config.model,
                        attempt,
                        json_mode = request.json_mode,
                        chars = content.chars().count(),
                        "generation succeeded"
                    );
                    return Ok(content);
                }
                Err(err) => {
                    let policy = err.retry_policy();
                    if !policy.is_retryable() || attempt + 1 >= attempts {
                        warn!(model = %self.config.model, attempt, error = %err, "generation failed");
                        return Err(err);
                    }
                    let delay = retry_delay(&policy, attempt);
                    warn!(
                        model = %self.config.model,
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        error = %err,
                        "generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn model_name(&self) -> ModelName {
        self.model.clone()
    }
}
