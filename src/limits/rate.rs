//! Sliding-window rate limiter for outbound API requests.
//!
//! One limiter instance exists per external dependency and lives for the
//! process lifetime. Every call attempt (including retries and prediction
//! polls) runs through the same instance, so the prune-check-append
//! sequence is guarded by a single mutex: concurrent per-subheading tasks
//! cannot over-admit.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Default interval between re-checks while waiting for a slot.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors produced by the blocking acquire path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// The limiter was built with `max_requests == 0` and can never admit.
    #[error("rate limiter configured with max_requests = 0 never admits")]
    NeverAdmits,
}

/// Sliding-window rate limiter.
///
/// Admission keeps an ordered log of request timestamps; entries older
/// than the window are pruned before each check. A request is admitted
/// when fewer than `max_requests` timestamps remain in the window.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use blogforge::limits::RateLimiter;
///
/// let limiter = RateLimiter::new(2, Duration::from_secs(60));
/// assert!(limiter.try_acquire());
/// assert!(limiter.try_acquire());
/// assert!(!limiter.try_acquire());
/// ```
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    poll_interval: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter admitting at most `max_requests` per `window`.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Overrides the re-check interval used by [`acquire`](Self::acquire).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Non-blocking admission check.
    ///
    /// Prunes expired timestamps, then admits and records the request if a
    /// slot is free. The whole sequence holds the internal lock, so two
    /// concurrent callers cannot both take the last slot.
    pub fn try_acquire(&self) -> bool {
        if self.max_requests == 0 {
            return false;
        }

        let now = Instant::now();
        let mut timestamps = self
            .timestamps
            .lock()
            .expect("rate limiter lock poisoned");

        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() < self.max_requests {
            timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Waits cooperatively until a slot frees, then admits.
    ///
    /// Sleeps in fixed increments between admission checks rather than
    /// busy-spinning, yielding the executor to other tasks.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::NeverAdmits`] when `max_requests` is zero,
    /// since no amount of waiting would free a slot.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        if self.max_requests == 0 {
            return Err(RateLimitError::NeverAdmits);
        }

        let mut waited = false;
        while !self.try_acquire() {
            if !waited {
                tracing::debug!(
                    max_requests = self.max_requests,
                    window_secs = self.window.as_secs_f64(),
                    "rate limit reached, waiting for a slot"
                );
                waited = true;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Ok(())
    }

    /// Number of requests currently counted against the window.
    pub fn current_load(&self) -> usize {
        let now = Instant::now();
        let timestamps = self
            .timestamps
            .lock()
            .expect("rate limiter lock poisoned");
        timestamps
            .iter()
            .filter(|ts| now.duration_since(**ts) < self.window)
            .count()
    }

    /// The configured per-window budget.
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }
}
