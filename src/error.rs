//! Error types for blogforge operations.
//!
//! Defines error types for the major subsystems:
//! - Configuration loading and validation
//! - Input note parsing and domain model validation
//! - Role workers (analysis, research, writing, imagery, metadata)
//!
//! Resilience-layer errors (`CallFailure`, `RetryError`, `RateLimitError`)
//! live next to the primitives that produce them in [`crate::limits`], and
//! the pipeline-level `PipelineError` lives in [`crate::pipeline`].

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// An API credential is absent or still set to its placeholder value.
    #[error("Credential for {service} not configured")]
    MissingCredential { service: &'static str },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors raised while constructing or validating domain models.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Note content too short: {length} chars (minimum {minimum})")]
    ContentTooShort { length: usize, minimum: usize },

    #[error("Invalid filename '{0}': must end with .md")]
    InvalidFilename(String),

    #[error("Field '{field}' failed validation: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by role workers.
///
/// Adapters never surface expected failures as errors; they return a
/// failure outcome instead. A worker converts that outcome into an
/// `AgentError` only when the step cannot proceed without the payload.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The backing adapter reported a failure (after its own retries).
    #[error("{agent} call failed: {message}")]
    CallFailed { agent: &'static str, message: String },

    /// The adapter succeeded but the response could not be turned into
    /// the structured data the step requires.
    #[error("{agent} produced an unusable response: {message}")]
    UnusableResponse { agent: &'static str, message: String },

    /// A step input failed validation before any work started.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string());
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));

        let err = ConfigError::MissingCredential { service: "brave" };
        assert!(err.to_string().contains("brave"));

        let err = ConfigError::ValidationFailed("cache_max_size must be > 0".to_string());
        assert!(err.to_string().contains("cache_max_size"));
    }

    #[test]
    fn test_model_error_display() {
        let err = ModelError::ContentTooShort {
            length: 4,
            minimum: 10,
        };
        assert!(err.to_string().contains('4'));
        assert!(err.to_string().contains("10"));

        let err = ModelError::InvalidFilename("post.txt".to_string());
        assert!(err.to_string().contains("post.txt"));
    }

    #[test]
    fn test_agent_error_display() {
        let err = AgentError::CallFailed {
            agent: "researcher",
            message: "retries exhausted".to_string(),
        };
        assert!(err.to_string().contains("researcher"));
        assert!(err.to_string().contains("retries exhausted"));

        let err = AgentError::UnusableResponse {
            agent: "content analyzer",
            message: "no title".to_string(),
        };
        assert!(err.to_string().contains("no title"));
    }
}
