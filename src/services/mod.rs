//! External call adapters for the three remote dependencies.
//!
//! Each adapter composes the resilience primitives from [`crate::limits`]
//! around one network call: cache lookup (search only), rate-limiter
//! admission, a retry-wrapped request, response parsing, and cache
//! population (search only, on success).
//!
//! Adapters never raise for expected failure modes. Every call returns a
//! [`CallOutcome`] carrying either the typed payload or an error message,
//! plus metadata about the call. Input violations (out-of-range
//! temperature, bad image dimensions) and unconfigured credentials are
//! detected before any I/O and surface the same way.

pub mod brave;
pub mod openrouter;
pub mod replicate;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

pub use brave::{BraveSearchClient, SearchHit, SearchRequest, SearchResults};
pub use openrouter::{Generation, GenerationRequest, Message, OpenRouterClient, Usage};
pub use replicate::{GeneratedImages, ImageRequest, ReplicateClient};

/// Metadata about how an adapter call was served.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallMeta {
    /// Wall-clock time spent inside the adapter.
    pub elapsed: Duration,
    /// Whether the payload came from the response cache.
    pub from_cache: bool,
}

/// Uniform outcome of an adapter call.
///
/// Exactly one of payload and error is populated; the constructors are
/// the only way to build a value, so the invariant cannot be violated.
#[derive(Debug, Clone)]
pub struct CallOutcome<T> {
    payload: Option<T>,
    error: Option<String>,
    /// Call metadata (elapsed time, cache provenance).
    pub meta: CallMeta,
}

impl<T> CallOutcome<T> {
    /// Builds a successful outcome.
    pub fn success(payload: T, meta: CallMeta) -> Self {
        Self {
            payload: Some(payload),
            error: None,
            meta,
        }
    }

    /// Builds a failed outcome.
    pub fn failure(error: impl Into<String>, meta: CallMeta) -> Self {
        Self {
            payload: None,
            error: Some(error.into()),
            meta,
        }
    }

    /// Whether the call produced a payload.
    pub fn is_success(&self) -> bool {
        self.payload.is_some()
    }

    /// The payload, when present.
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// The error message, when present.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Converts into a plain result, dropping the metadata.
    pub fn into_result(self) -> Result<T, String> {
        match self.payload {
            Some(payload) => Ok(payload),
            None => Err(self
                .error
                .unwrap_or_else(|| "call failed with no error detail".to_string())),
        }
    }
}

/// Health probe result for one external dependency.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Which service was probed.
    pub service: &'static str,
    /// Whether the probe succeeded.
    pub healthy: bool,
    /// Probe duration.
    pub elapsed: Duration,
    /// Failure detail when unhealthy.
    pub error: Option<String>,
}

/// Text generation seam between role workers and the LLM adapter.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for the given request.
    async fn generate(&self, request: GenerationRequest) -> CallOutcome<Generation>;
}

/// Web search seam between the researcher and the search adapter.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Runs a web search, consulting the response cache first.
    async fn search(&self, request: SearchRequest) -> CallOutcome<SearchResults>;
}

/// Image generation seam between the imagery worker and the image adapter.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Submits an image generation job and waits for its completion.
    async fn generate_image(&self, request: ImageRequest) -> CallOutcome<GeneratedImages>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success() {
        let outcome = CallOutcome::success(7u32, CallMeta::default());
        assert!(outcome.is_success());
        assert_eq!(outcome.payload(), Some(&7));
        assert!(outcome.error().is_none());
        assert_eq!(outcome.into_result(), Ok(7));
    }

    #[test]
    fn test_outcome_failure() {
        let outcome: CallOutcome<u32> = CallOutcome::failure("boom", CallMeta::default());
        assert!(!outcome.is_success());
        assert!(outcome.payload().is_none());
        assert_eq!(outcome.error(), Some("boom"));
        assert_eq!(outcome.into_result(), Err("boom".to_string()));
    }

    #[test]
    fn test_outcome_meta_from_cache() {
        let meta = CallMeta {
            elapsed: Duration::from_millis(3),
            from_cache: true,
        };
        let outcome = CallOutcome::success("hits", meta);
        assert!(outcome.meta.from_cache);
    }
}
