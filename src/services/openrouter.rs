//! OpenRouter adapter for LLM text generation.
//!
//! Composes credential and input validation, the shared rate limiter, and
//! retry-with-backoff around the `chat/completions` endpoint. Generation
//! responses are not cached: prompts are rarely identical across calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{is_placeholder, AppConfig};
use crate::limits::{CallFailure, RateLimiter, RetryPolicy};

use super::{CallMeta, CallOutcome, HealthReport, TextGenerator};

/// A message in a conversation with an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender ("system", "user", "assistant").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request for text generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier; empty selects the adapter's default model.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 - 2.0).
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate (1 - 8192).
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a new generation request with default parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the temperature for this request.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens for this request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Validates parameter ranges before any network attempt.
    pub fn validate(&self) -> Result<(), String> {
        if self.messages.is_empty() {
            return Err("generation request has no messages".to_string());
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!(
                    "temperature {} outside valid range [0.0, 2.0]",
                    temperature
                ));
            }
        }
        if let Some(max_tokens) = self.max_tokens {
            if max_tokens == 0 || max_tokens > 8192 {
                return Err(format!(
                    "max_tokens {} outside valid range [1, 8192]",
                    max_tokens
                ));
            }
        }
        Ok(())
    }
}

/// Successful generation payload.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Generated text of the first choice.
    pub content: String,
    /// Model that produced the response.
    pub model: String,
    /// Token usage statistics.
    pub usage: Usage,
}

/// Token usage statistics for a generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Adapter for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    http: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl OpenRouterClient {
    /// Builds the adapter from application configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::builder()
                .timeout(config.limits.request_timeout)
                .build()
                .expect("Failed to build HTTP client - system TLS configuration error"),
            api_key: config.api.openrouter_api_key.clone(),
            base_url: config.api.openrouter_base_url.clone(),
            default_model: config.llm.default_model.clone(),
            limiter: Arc::new(RateLimiter::new(
                config.limits.rate_limit_requests,
                config.limits.rate_limit_window,
            )),
            retry: RetryPolicy::new(config.limits.max_retries)
                .with_initial_backoff(config.limits.initial_backoff)
                .with_max_backoff(config.limits.max_backoff),
        }
    }

    /// The configured default model.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// The rate limiter backing this adapter, shared with every retry and
    /// concurrent caller.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Probes the service with a minimal generation request.
    pub async fn health_check(&self) -> HealthReport {
        let started = Instant::now();
        let request = GenerationRequest::new(
            "",
            vec![Message::user("Reply with the single word: ok")],
        )
        .with_max_tokens(10)
        .with_temperature(0.0);

        let outcome = self.generate(request).await;
        HealthReport {
            service: "openrouter",
            healthy: outcome.is_success(),
            elapsed: started.elapsed(),
            error: outcome.error().map(String::from),
        }
    }

    /// Executes a single request attempt, classifying failures for the
    /// retry policy.
    async fn execute_once(&self, request: &ApiRequest) -> Result<Generation, CallFailure> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| CallFailure::TransientNetwork(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            if status_code == 429 {
                let retry_after = parse_retry_after(&response);
                return Err(CallFailure::RateLimited { retry_after });
            }

            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            let message = parse_api_error(&body).unwrap_or(body);

            if status.is_server_error() {
                return Err(CallFailure::ServerError {
                    status: status_code,
                });
            }
            return Err(CallFailure::ClientError {
                status: status_code,
                message,
            });
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            CallFailure::Fatal(format!("failed to parse generation response: {}", e))
        })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CallFailure::Fatal("response contained no choices".to_string()))?;

        Ok(Generation {
            content,
            model: api_response.model,
            usage: api_response.usage.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate(&self, request: GenerationRequest) -> CallOutcome<Generation> {
        let started = Instant::now();
        let meta = |started: Instant| CallMeta {
            elapsed: started.elapsed(),
            from_cache: false,
        };

        if let Err(message) = request.validate() {
            tracing::warn!(error = %message, "rejecting invalid generation request");
            return CallOutcome::failure(message, meta(started));
        }
        if is_placeholder(&self.api_key) {
            return CallOutcome::failure(
                "OpenRouter API key not configured; set OPENROUTER_API_KEY",
                meta(started),
            );
        }

        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };
        let api_request = ApiRequest {
            model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let request_ref = &api_request;
        let result = self
            .retry
            .execute(|| async move {
                self.limiter
                    .acquire()
                    .await
                    .map_err(|e| CallFailure::Fatal(e.to_string()))?;
                self.execute_once(request_ref).await
            })
            .await;

        match result {
            Ok(generation) => {
                tracing::debug!(
                    model = %generation.model,
                    total_tokens = generation.usage.total_tokens,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "generation completed"
                );
                CallOutcome::success(generation, meta(started))
            }
            Err(err) => {
                tracing::warn!(error = %err, "generation failed");
                CallOutcome::failure(err.to_string(), meta(started))
            }
        }
    }
}

/// Reads a `Retry-After` header expressed in seconds.
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("Retry-After")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Extracts the error message from a structured API error body.
fn parse_api_error(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .map(|response| response.error.message)
}

/// Internal request structure for the OpenAI-compatible API.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Internal response structure from the API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
