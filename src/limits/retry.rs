//! Retry-with-backoff for transient external call failures.
//!
//! A single outbound call produces either a result or a [`CallFailure`]
//! classifying what went wrong. [`RetryPolicy::execute`] re-runs the call
//! for transient classes (rate limits, 5xx, network errors) with
//! exponential backoff, and short-circuits immediately on fatal classes
//! (other 4xx, unrecoverable errors).

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Classified outcome of one failed call attempt.
#[derive(Debug, Clone, Error)]
pub enum CallFailure {
    /// Upstream returned HTTP 429. Carries the server-advised delay when
    /// a `Retry-After` header was present.
    #[error("rate limited by upstream")]
    RateLimited { retry_after: Option<Duration> },

    /// Upstream returned a 5xx status.
    #[error("server error (HTTP {status})")]
    ServerError { status: u16 },

    /// The request never completed: timeout, connection reset, DNS, etc.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Upstream returned a non-429 4xx status. Not retryable.
    #[error("client error (HTTP {status}): {message}")]
    ClientError { status: u16, message: String },

    /// Any other unrecoverable failure. Not retryable.
    #[error("{0}")]
    Fatal(String),
}

impl CallFailure {
    /// Whether this failure class is worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CallFailure::RateLimited { .. }
                | CallFailure::ServerError { .. }
                | CallFailure::TransientNetwork(_)
        )
    }
}

/// Errors produced by [`RetryPolicy::execute`].
#[derive(Debug, Clone, Error)]
pub enum RetryError {
    /// All attempts failed with transient errors; carries the last one.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: CallFailure,
    },

    /// A fatal failure ended the call on its first occurrence.
    #[error(transparent)]
    Aborted(CallFailure),
}

/// Bounded exponential-backoff retry policy.
///
/// Allows up to `max_retries` attempts beyond the first. The delay before
/// a retry starts at `initial_backoff` and doubles after each transient
/// failure, capped at `max_backoff`. A rate-limited failure sleeps for the
/// server-advised `Retry-After` when present, the current backoff
/// otherwise.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry budget and default timings.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Sets the delay before the first retry.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Sets the upper bound on the backoff delay.
    pub fn with_max_backoff(mut self, cap: Duration) -> Self {
        self.max_backoff = cap;
        self
    }

    /// The configured number of extra attempts beyond the first.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Runs `operation`, retrying transient failures with backoff.
    ///
    /// # Errors
    ///
    /// - [`RetryError::Aborted`] on the first fatal failure (client errors
    ///   and other unrecoverable conditions are never retried).
    /// - [`RetryError::Exhausted`] once `max_retries + 1` attempts have
    ///   all failed transiently, wrapping the last failure.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallFailure>>,
    {
        let total_attempts = self.max_retries + 1;
        let mut backoff = self.initial_backoff;
        let mut last_failure = None;

        for attempt in 1..=total_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(failure) => {
                    if !failure.is_transient() {
                        tracing::warn!(error = %failure, "fatal call failure, not retrying");
                        return Err(RetryError::Aborted(failure));
                    }

                    if attempt == total_attempts {
                        last_failure = Some(failure);
                        break;
                    }

                    let delay = match &failure {
                        CallFailure::RateLimited {
                            retry_after: Some(advised),
                        } => *advised,
                        _ => backoff,
                    };
                    tracing::warn!(
                        attempt,
                        total_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "transient call failure, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                    backoff = backoff.mul_f64(self.multiplier).min(self.max_backoff);
                }
            }
        }

        let source = last_failure.unwrap_or_else(|| {
            CallFailure::Fatal("retry loop ended with no recorded failure".to_string())
        });
        Err(RetryError::Exhausted {
            attempts: total_attempts,
            source,
        })
    }
}
