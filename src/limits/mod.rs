//! Resilience primitives for external call adapters.
//!
//! Every outbound dependency is wrapped in the same three layers:
//! a sliding-window [`RateLimiter`], a classified-failure [`RetryPolicy`],
//! and (for idempotent reads) a TTL-bounded [`ResponseCache`]. Adapters
//! share one limiter and one cache instance per dependency; both serialize
//! their read-modify-write sequences internally, so concurrent
//! per-subheading tasks can use them without extra locking.

pub mod cache;
pub mod rate;
pub mod retry;

pub use cache::{CacheStats, ResponseCache};
pub use rate::{RateLimitError, RateLimiter};
pub use retry::{CallFailure, RetryError, RetryPolicy};
