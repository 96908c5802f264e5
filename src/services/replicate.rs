//! Replicate adapter for image generation.
//!
//! Image generation is long-running, so the adapter is create-then-poll:
//! it submits a prediction job, then polls its status on a backoff
//! schedule (2s initial, x1.5, capped at 10s) until the job succeeds,
//! fails, or the absolute timeout elapses. A timeout is reported as a
//! distinct failure from a server-side one, and a timed-out job gets a
//! best-effort cancel so the orchestrator is never left blocked.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{is_placeholder, AppConfig, ImageConfig};
use crate::limits::{CallFailure, RateLimiter, RetryPolicy};

use super::{CallMeta, CallOutcome, HealthReport, ImageGenerator};

/// Parameters for one image generation job.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    /// Image generation prompt (1 - 1000 chars).
    pub prompt: String,
    /// Image width in pixels (multiple of 8, 256 - 2048).
    pub width: u32,
    /// Image height in pixels (multiple of 8, 256 - 2048).
    pub height: u32,
    /// Number of images to generate (1 - 4).
    pub num_outputs: u32,
}

impl ImageRequest {
    /// Creates a request with 1024x1024 dimensions and a single output.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: 1024,
            height: 1024,
            num_outputs: 1,
        }
    }

    /// Sets the output dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the number of outputs.
    pub fn with_num_outputs(mut self, num_outputs: u32) -> Self {
        self.num_outputs = num_outputs;
        self
    }

    /// Validates parameter ranges before any network attempt.
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() || self.prompt.len() > 1000 {
            return Err("prompt must be 1 to 1000 characters".to_string());
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if !(256..=2048).contains(&value) || value % 8 != 0 {
                return Err(format!(
                    "{} {} must be a multiple of 8 within [256, 2048]",
                    name, value
                ));
            }
        }
        if !(1..=4).contains(&self.num_outputs) {
            return Err(format!(
                "num_outputs {} outside valid range [1, 4]",
                self.num_outputs
            ));
        }
        Ok(())
    }
}

/// Successful image generation payload.
#[derive(Debug, Clone)]
pub struct GeneratedImages {
    /// URLs of the generated images.
    pub urls: Vec<String>,
    /// Prediction job identifier.
    pub prediction_id: String,
    /// Model version that produced the images.
    pub model: String,
}

/// Adapter for the Replicate predictions API.
pub struct ReplicateClient {
    http: Client,
    api_token: String,
    base_url: String,
    image: ImageConfig,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl ReplicateClient {
    /// Builds the adapter from application configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::builder()
                .timeout(config.limits.request_timeout)
                .build()
                .expect("Failed to build HTTP client - system TLS configuration error"),
            api_token: config.api.replicate_api_token.clone(),
            base_url: config.api.replicate_base_url.clone(),
            image: config.image.clone(),
            limiter: Arc::new(RateLimiter::new(
                config.limits.rate_limit_requests,
                config.limits.rate_limit_window,
            )),
            retry: RetryPolicy::new(config.limits.max_retries)
                .with_initial_backoff(config.limits.initial_backoff)
                .with_max_backoff(config.limits.max_backoff),
        }
    }

    /// The rate limiter backing this adapter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Probes the service by listing the prediction endpoint.
    ///
    /// Uses a plain GET rather than a real generation: a health probe
    /// should not spend minutes rendering an image.
    pub async fn health_check(&self) -> HealthReport {
        let started = Instant::now();
        let url = format!("{}/predictions", self.base_url);
        let result = self
            .http
            .get(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await;

        let (healthy, error) = match result {
            Ok(response) if response.status().is_success() => (true, None),
            Ok(response) => (false, Some(format!("HTTP {}", response.status().as_u16()))),
            Err(e) => (false, Some(e.to_string())),
        };
        HealthReport {
            service: "replicate",
            healthy,
            elapsed: started.elapsed(),
            error,
        }
    }

    /// Submits a prediction job.
    async fn create_prediction(&self, request: &ImageRequest) -> Result<Prediction, CallFailure> {
        let url = format!("{}/predictions", self.base_url);
        let body = CreatePredictionRequest {
            version: self.image.model.clone(),
            input: PredictionInput {
                prompt: request.prompt.clone(),
                width: request.width,
                height: request.height,
                num_outputs: request.num_outputs,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CallFailure::TransientNetwork(e.to_string()))?;

        classify_and_parse(response).await
    }

    /// Fetches the current state of a prediction job.
    async fn get_prediction(&self, prediction_id: &str) -> Result<Prediction, CallFailure> {
        let url = format!("{}/predictions/{}", self.base_url, prediction_id);
        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await
            .map_err(|e| CallFailure::TransientNetwork(e.to_string()))?;

        classify_and_parse(response).await
    }

    /// Best-effort cancel for a job the adapter stopped waiting on.
    async fn cancel_prediction(&self, prediction_id: &str) {
        let url = format!("{}/predictions/{}/cancel", self.base_url, prediction_id);
        match self
            .http
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::info!(prediction_id, "cancelled timed-out prediction");
            }
            Ok(response) => {
                tracing::warn!(
                    prediction_id,
                    status = response.status().as_u16(),
                    "cancel request rejected"
                );
            }
            Err(e) => {
                tracing::warn!(prediction_id, error = %e, "cancel request failed");
            }
        }
    }

    /// Polls a prediction until it finishes or the timeout elapses.
    async fn wait_for_completion(
        &self,
        mut prediction: Prediction,
    ) -> Result<GeneratedImages, String> {
        let deadline = Instant::now() + self.image.poll_timeout;
        let mut interval = self.image.poll_initial;

        loop {
            match prediction.status.as_str() {
                "succeeded" => {
                    let urls = extract_output_urls(prediction.output.as_ref());
                    if urls.is_empty() {
                        return Err(format!(
                            "prediction {} succeeded with no output", prediction.id
                        ));
                    }
                    return Ok(GeneratedImages {
                        urls,
                        prediction_id: prediction.id,
                        model: self.image.model.clone(),
                    });
                }
                "failed" | "canceled" => {
                    return Err(prediction
                        .error
                        .unwrap_or_else(|| format!("prediction {} failed", prediction.id)));
                }
                other => {
                    // "starting" / "processing" keep polling; anything
                    // unrecognized is treated the same way.
                    tracing::debug!(prediction_id = %prediction.id, status = other, "prediction pending");
                }
            }

            if Instant::now() + interval > deadline {
                self.cancel_prediction(&prediction.id).await;
                return Err(format!(
                    "image generation timed out after {}s",
                    self.image.poll_timeout.as_secs()
                ));
            }

            tokio::time::sleep(interval).await;
            interval = interval
                .mul_f64(self.image.poll_multiplier)
                .min(self.image.poll_max_interval);

            let prediction_id = prediction.id.clone();
            let id_ref = prediction_id.as_str();
            prediction = match self
                .retry
                .execute(|| async move {
                    self.limiter
                        .acquire()
                        .await
                        .map_err(|e| CallFailure::Fatal(e.to_string()))?;
                    self.get_prediction(id_ref).await
                })
                .await
            {
                Ok(updated) => updated,
                Err(err) => return Err(err.to_string()),
            };
        }
    }
}

#[async_trait]
impl ImageGenerator for ReplicateClient {
    async fn generate_image(&self, request: ImageRequest) -> CallOutcome<GeneratedImages> {
        let started = Instant::now();
        let meta = |started: Instant| CallMeta {
            elapsed: started.elapsed(),
            from_cache: false,
        };

        if let Err(message) = request.validate() {
            tracing::warn!(error = %message, "rejecting invalid image request");
            return CallOutcome::failure(message, meta(started));
        }
        if is_placeholder(&self.api_token) {
            return CallOutcome::failure(
                "Replicate API token not configured; set REPLICATE_API_TOKEN",
                meta(started),
            );
        }

        let request_ref = &request;
        let created = self
            .retry
            .execute(|| async move {
                self.limiter
                    .acquire()
                    .await
                    .map_err(|e| CallFailure::Fatal(e.to_string()))?;
                self.create_prediction(request_ref).await
            })
            .await;

        let prediction = match created {
            Ok(prediction) => prediction,
            Err(err) => {
                tracing::warn!(error = %err, "failed to create prediction");
                return CallOutcome::failure(err.to_string(), meta(started));
            }
        };

        tracing::info!(prediction_id = %prediction.id, "prediction created, polling");
        match self.wait_for_completion(prediction).await {
            Ok(images) => {
                tracing::info!(
                    prediction_id = %images.prediction_id,
                    count = images.urls.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "image generation completed"
                );
                CallOutcome::success(images, meta(started))
            }
            Err(message) => {
                tracing::warn!(error = %message, "image generation failed");
                CallOutcome::failure(message, meta(started))
            }
        }
    }
}

/// Maps an HTTP response to a parsed prediction or a classified failure.
async fn classify_and_parse(response: reqwest::Response) -> Result<Prediction, CallFailure> {
    let status = response.status();
    if !status.is_success() {
        let status_code = status.as_u16();
        if status_code == 429 {
            return Err(CallFailure::RateLimited { retry_after: None });
        }
        if status.is_server_error() {
            return Err(CallFailure::ServerError {
                status: status_code,
            });
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error response".to_string());
        return Err(CallFailure::ClientError {
            status: status_code,
            message: body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| CallFailure::Fatal(format!("failed to parse prediction: {}", e)))
}

/// Pulls image URLs out of the prediction output, which the API returns
/// as either a single string or a list of strings.
fn extract_output_urls(output: Option<&serde_json::Value>) -> Vec<String> {
    match output {
        Some(serde_json::Value::String(url)) => vec![url.clone()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Serialize)]
struct CreatePredictionRequest {
    version: String,
    input: PredictionInput,
}

#[derive(Debug, Serialize)]
struct PredictionInput {
    prompt: String,
    width: u32,
    height: u32,
    num_outputs: u32,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}
