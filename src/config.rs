//! Application configuration for the blog pipeline.
//!
//! Configuration is an explicit struct constructed once (typically via
//! [`AppConfig::from_env`]) and passed by reference into the orchestrator
//! and each adapter at construction time. There is no ambient global state.

use std::time::Duration;

use crate::error::ConfigError;

/// Placeholder credential values that must be rejected before any network
/// attempt. These match the `.env.example` defaults shipped with the app.
const PLACEHOLDER_CREDENTIALS: [&str; 3] = [
    "your_openrouter_api_key_here",
    "your_replicate_api_token_here",
    "your_brave_api_key_here",
];

/// Returns true when a credential is absent or still a placeholder.
pub(crate) fn is_placeholder(credential: &str) -> bool {
    credential.trim().is_empty() || PLACEHOLDER_CREDENTIALS.contains(&credential.trim())
}

/// API endpoints and credentials for the three external dependencies.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// OpenRouter API key for LLM generation.
    pub openrouter_api_key: String,
    /// Base URL for the OpenRouter API.
    pub openrouter_base_url: String,
    /// Replicate API token for image generation.
    pub replicate_api_token: String,
    /// Base URL for the Replicate API.
    pub replicate_base_url: String,
    /// Brave Search API key.
    pub brave_api_key: String,
    /// Endpoint URL for Brave web search.
    pub brave_search_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            openrouter_api_key: String::new(),
            openrouter_base_url: "https://openrouter.ai/api/v1".to_string(),
            replicate_api_token: String::new(),
            replicate_base_url: "https://api.replicate.com/v1".to_string(),
            brave_api_key: String::new(),
            brave_search_url: "https://api.search.brave.com/res/v1/web/search".to_string(),
        }
    }
}

/// LLM generation defaults applied by the role workers.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Default model for generation requests.
    pub default_model: String,
    /// Sampling temperature (0.0 - 2.0).
    pub temperature: f64,
    /// Maximum tokens per generation (1 - 8192).
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_model: "openai/gpt-4".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

/// Content shaping rules for the generated post.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Minimum number of subheadings in a post.
    pub min_subheadings: usize,
    /// Maximum number of subheadings in a post.
    pub max_subheadings: usize,
    /// Minimum number of tags in post metadata.
    pub min_tags: usize,
    /// Maximum number of tags in post metadata.
    pub max_tags: usize,
    /// De-duplicate key points and sources when combining main-topic and
    /// per-subheading research. Off by default: concatenation preserves
    /// the historical behavior.
    pub dedupe_research: bool,
    /// Number of web results requested per research query.
    pub search_results: u32,
    /// Characters of post content included in metadata/imagery prompts.
    pub preview_chars: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_subheadings: 2,
            max_subheadings: 5,
            min_tags: 2,
            max_tags: 5,
            dedupe_research: false,
            search_results: 5,
            preview_chars: 500,
        }
    }
}

/// Image generation parameters.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Replicate model version identifier.
    pub model: String,
    /// Image width in pixels (multiple of 8, 256 - 2048).
    pub width: u32,
    /// Image height in pixels (multiple of 8, 256 - 2048).
    pub height: u32,
    /// Maximum images generated per post.
    pub max_images_per_post: usize,
    /// Initial delay between prediction status polls.
    pub poll_initial: Duration,
    /// Multiplier applied to the poll delay after each check.
    pub poll_multiplier: f64,
    /// Upper bound on the poll delay.
    pub poll_max_interval: Duration,
    /// Absolute limit on how long one prediction may run.
    pub poll_timeout: Duration,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: "stability-ai/sdxl:39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b"
                .to_string(),
            width: 1024,
            height: 1024,
            max_images_per_post: 5,
            poll_initial: Duration::from_secs(2),
            poll_multiplier: 1.5,
            poll_max_interval: Duration::from_secs(10),
            poll_timeout: Duration::from_secs(300),
        }
    }
}

/// Resilience parameters shared by the external call adapters.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Requests admitted per rate-limit window, per dependency.
    pub rate_limit_requests: usize,
    /// Sliding-window duration for the rate limiter.
    pub rate_limit_window: Duration,
    /// Extra attempts beyond the first for transient failures.
    pub max_retries: u32,
    /// Initial retry backoff.
    pub initial_backoff: Duration,
    /// Upper bound on the retry backoff.
    pub max_backoff: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// TTL for cached search responses.
    pub cache_ttl: Duration,
    /// Maximum number of cached search responses.
    pub cache_max_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit_requests: 60,
            rate_limit_window: Duration::from_secs(60),
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            cache_ttl: Duration::from_secs(3600),
            cache_max_size: 1000,
        }
    }
}

/// Top-level configuration for the pipeline and its adapters.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub llm: LlmConfig,
    pub content: ContentConfig,
    pub image: ImageConfig,
    pub limits: LimitsConfig,
}

impl AppConfig {
    /// Creates a new configuration with default values.
    ///
    /// Credentials default to empty strings, so [`validate`](Self::validate)
    /// fails until real keys are supplied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENROUTER_API_KEY`: OpenRouter API key (required)
    /// - `OPENROUTER_BASE_URL`: OpenRouter endpoint override
    /// - `REPLICATE_API_TOKEN`: Replicate API token (required)
    /// - `BRAVE_API_KEY`: Brave Search API key (required)
    /// - `BRAVE_SEARCH_URL`: Brave Search endpoint override
    /// - `DEFAULT_MODEL`: LLM model identifier
    /// - `AGENT_TEMPERATURE`: generation temperature
    /// - `IMAGE_MODEL`: Replicate model version
    /// - `IMAGE_WIDTH` / `IMAGE_HEIGHT`: image dimensions
    /// - `RATE_LIMIT_REQUESTS_PER_MINUTE`: limiter budget per dependency
    /// - `MAX_RETRIES`: extra attempts for transient failures
    /// - `REQUEST_TIMEOUT`: HTTP timeout in seconds
    /// - `CACHE_TTL`: search cache TTL in seconds
    /// - `CACHE_MAX_SIZE`: search cache capacity
    /// - `DEDUPE_RESEARCH`: de-duplicate combined research (bool)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, a value
    /// fails to parse, or validation rejects the result.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.api.openrouter_api_key = require_env("OPENROUTER_API_KEY")?;
        config.api.replicate_api_token = require_env("REPLICATE_API_TOKEN")?;
        config.api.brave_api_key = require_env("BRAVE_API_KEY")?;

        if let Ok(val) = std::env::var("OPENROUTER_BASE_URL") {
            config.api.openrouter_base_url = val;
        }
        if let Ok(val) = std::env::var("BRAVE_SEARCH_URL") {
            config.api.brave_search_url = val;
        }
        if let Ok(val) = std::env::var("DEFAULT_MODEL") {
            config.llm.default_model = val;
        }
        if let Ok(val) = std::env::var("AGENT_TEMPERATURE") {
            config.llm.temperature = parse_env_value(&val, "AGENT_TEMPERATURE")?;
        }
        if let Ok(val) = std::env::var("IMAGE_MODEL") {
            config.image.model = val;
        }
        if let Ok(val) = std::env::var("IMAGE_WIDTH") {
            config.image.width = parse_env_value(&val, "IMAGE_WIDTH")?;
        }
        if let Ok(val) = std::env::var("IMAGE_HEIGHT") {
            config.image.height = parse_env_value(&val, "IMAGE_HEIGHT")?;
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_REQUESTS_PER_MINUTE") {
            config.limits.rate_limit_requests =
                parse_env_value(&val, "RATE_LIMIT_REQUESTS_PER_MINUTE")?;
        }
        if let Ok(val) = std::env::var("MAX_RETRIES") {
            config.limits.max_retries = parse_env_value(&val, "MAX_RETRIES")?;
        }
        if let Ok(val) = std::env::var("REQUEST_TIMEOUT") {
            let secs: u64 = parse_env_value(&val, "REQUEST_TIMEOUT")?;
            config.limits.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(val) = std::env::var("CACHE_TTL") {
            let secs: u64 = parse_env_value(&val, "CACHE_TTL")?;
            config.limits.cache_ttl = Duration::from_secs(secs);
        }
        if let Ok(val) = std::env::var("CACHE_MAX_SIZE") {
            config.limits.cache_max_size = parse_env_value(&val, "CACHE_MAX_SIZE")?;
        }
        if let Ok(val) = std::env::var("DEDUPE_RESEARCH") {
            config.content.dedupe_research = parse_env_bool(&val, "DEDUPE_RESEARCH")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any credential is a placeholder or a
    /// numeric parameter is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_placeholder(&self.api.openrouter_api_key) {
            return Err(ConfigError::MissingCredential {
                service: "openrouter",
            });
        }
        if is_placeholder(&self.api.replicate_api_token) {
            return Err(ConfigError::MissingCredential {
                service: "replicate",
            });
        }
        if is_placeholder(&self.api.brave_api_key) {
            return Err(ConfigError::MissingCredential { service: "brave" });
        }

        if self.llm.default_model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "default_model cannot be empty".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationFailed(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if self.llm.max_tokens == 0 || self.llm.max_tokens > 8192 {
            return Err(ConfigError::ValidationFailed(
                "max_tokens must be between 1 and 8192".to_string(),
            ));
        }

        if self.content.min_subheadings < 1
            || self.content.min_subheadings > self.content.max_subheadings
        {
            return Err(ConfigError::ValidationFailed(
                "subheading bounds must satisfy 1 <= min <= max".to_string(),
            ));
        }
        if self.content.min_tags < 1 || self.content.min_tags > self.content.max_tags {
            return Err(ConfigError::ValidationFailed(
                "tag bounds must satisfy 1 <= min <= max".to_string(),
            ));
        }

        for (name, value) in [
            ("image width", self.image.width),
            ("image height", self.image.height),
        ] {
            if !(256..=2048).contains(&value) || value % 8 != 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be a multiple of 8 within [256, 2048]",
                    name
                )));
            }
        }
        if self.image.poll_multiplier < 1.0 {
            return Err(ConfigError::ValidationFailed(
                "poll_multiplier must be >= 1.0".to_string(),
            ));
        }

        if self.limits.rate_limit_requests == 0 {
            return Err(ConfigError::ValidationFailed(
                "rate_limit_requests must be greater than 0".to_string(),
            ));
        }
        if self.limits.rate_limit_window.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "rate_limit_window must be greater than 0".to_string(),
            ));
        }
        if self.limits.cache_max_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "cache_max_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the OpenRouter API key.
    pub fn with_openrouter_api_key(mut self, key: impl Into<String>) -> Self {
        self.api.openrouter_api_key = key.into();
        self
    }

    /// Builder method to set the OpenRouter base URL.
    pub fn with_openrouter_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.openrouter_base_url = url.into();
        self
    }

    /// Builder method to set the Replicate API token.
    pub fn with_replicate_api_token(mut self, token: impl Into<String>) -> Self {
        self.api.replicate_api_token = token.into();
        self
    }

    /// Builder method to set the Replicate base URL.
    pub fn with_replicate_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.replicate_base_url = url.into();
        self
    }

    /// Builder method to set the Brave API key.
    pub fn with_brave_api_key(mut self, key: impl Into<String>) -> Self {
        self.api.brave_api_key = key.into();
        self
    }

    /// Builder method to set the Brave Search endpoint.
    pub fn with_brave_search_url(mut self, url: impl Into<String>) -> Self {
        self.api.brave_search_url = url.into();
        self
    }

    /// Builder method to set the default LLM model.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.llm.default_model = model.into();
        self
    }

    /// Builder method to set the retry budget.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.limits.max_retries = retries;
        self
    }

    /// Builder method to set the initial retry backoff.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.limits.initial_backoff = backoff;
        self
    }

    /// Builder method to set the rate-limit budget per window.
    pub fn with_rate_limit(mut self, requests: usize, window: Duration) -> Self {
        self.limits.rate_limit_requests = requests;
        self.limits.rate_limit_window = window;
        self
    }

    /// Builder method to set the per-request HTTP timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.limits.request_timeout = timeout;
        self
    }

    /// Builder method to toggle research de-duplication.
    pub fn with_dedupe_research(mut self, enabled: bool) -> Self {
        self.content.dedupe_research = enabled;
        self
    }
}

/// Reads a required environment variable.
fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}
