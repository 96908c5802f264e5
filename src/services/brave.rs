//! Brave Search adapter for web research.
//!
//! The only cached adapter: search is an idempotent read, so responses go
//! through the TTL-bounded [`ResponseCache`] keyed by the raw query text.
//! Cache lookup happens before the rate limiter; only real network
//! attempts consume admission slots.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{is_placeholder, AppConfig};
use crate::limits::{CallFailure, RateLimiter, ResponseCache, RetryPolicy};

use super::{CallMeta, CallOutcome, HealthReport, WebSearcher};

/// Parameters for one web search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Raw query text; also the cache key.
    pub query: String,
    /// Number of results to request from the API.
    pub num_results: u32,
    /// Domains to boost; matches score +1.0, everything else -0.5.
    pub filter_domains: Vec<String>,
    /// Results scoring below this are dropped.
    pub min_score: f64,
}

impl SearchRequest {
    /// Creates a request with default result count and no filtering.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            num_results: 10,
            filter_domains: Vec::new(),
            min_score: 0.0,
        }
    }

    /// Sets the number of results to request.
    pub fn with_num_results(mut self, num_results: u32) -> Self {
        self.num_results = num_results;
        self
    }

    /// Sets the domains to boost during scoring.
    pub fn with_filter_domains(mut self, domains: Vec<String>) -> Self {
        self.filter_domains = domains;
        self
    }

    /// Sets the minimum score a result must reach to be kept.
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }
}

/// One scored search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub score: f64,
    #[serde(default)]
    pub source: Option<String>,
}

/// Filtered and sorted search results for a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub total: usize,
}

/// Adapter for the Brave web search API.
pub struct BraveSearchClient {
    http: Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    cache: Arc<ResponseCache<SearchResults>>,
}

impl BraveSearchClient {
    /// Builds the adapter from application configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::builder()
                .timeout(config.limits.request_timeout)
                .build()
                .expect("Failed to build HTTP client - system TLS configuration error"),
            api_key: config.api.brave_api_key.clone(),
            base_url: config.api.brave_search_url.clone(),
            limiter: Arc::new(RateLimiter::new(
                config.limits.rate_limit_requests,
                config.limits.rate_limit_window,
            )),
            retry: RetryPolicy::new(config.limits.max_retries)
                .with_initial_backoff(config.limits.initial_backoff)
                .with_max_backoff(config.limits.max_backoff),
            cache: Arc::new(ResponseCache::new(
                config.limits.cache_max_size,
                config.limits.cache_ttl,
            )),
        }
    }

    /// The response cache backing this adapter.
    pub fn cache(&self) -> &Arc<ResponseCache<SearchResults>> {
        &self.cache
    }

    /// The rate limiter backing this adapter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Probes the service with a one-result query.
    pub async fn health_check(&self) -> HealthReport {
        let started = Instant::now();
        let outcome = self
            .search(SearchRequest::new("search service health probe").with_num_results(1))
            .await;
        HealthReport {
            service: "brave-search",
            healthy: outcome.is_success(),
            elapsed: started.elapsed(),
            error: outcome.error().map(String::from),
        }
    }

    /// Executes a single search attempt, classifying failures for the
    /// retry policy.
    async fn fetch_once(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CallFailure> {
        let params = [
            ("q", request.query.clone()),
            ("count", request.num_results.to_string()),
            ("safesearch", "moderate".to_string()),
            ("result_filter", "web".to_string()),
        ];

        let response = self
            .http
            .get(&self.base_url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&params)
            .send()
            .await
            .map_err(|e| CallFailure::TransientNetwork(e.to_string()))?;

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

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| CallFailure::Fatal(format!("failed to parse search response: {}", e)))?;

        Ok(api_response
            .web
            .results
            .into_iter()
            .map(|item| SearchHit {
                title: item.title,
                url: item.url,
                snippet: item.description,
                score: 0.0,
                source: item.source,
            })
            .collect())
    }
}

#[async_trait]
impl WebSearcher for BraveSearchClient {
    async fn search(&self, request: SearchRequest) -> CallOutcome<SearchResults> {
        let started = Instant::now();

        if is_placeholder(&self.api_key) {
            return CallOutcome::failure(
                "Brave API key not configured; set BRAVE_API_KEY",
                CallMeta {
                    elapsed: started.elapsed(),
                    from_cache: false,
                },
            );
        }

        if let Some(cached) = self.cache.get(&request.query) {
            tracing::debug!(query = %request.query, "search served from cache");
            return CallOutcome::success(
                cached,
                CallMeta {
                    elapsed: started.elapsed(),
                    from_cache: true,
                },
            );
        }

        let request_ref = &request;
        let result = self
            .retry
            .execute(|| async move {
                self.limiter
                    .acquire()
                    .await
                    .map_err(|e| CallFailure::Fatal(e.to_string()))?;
                self.fetch_once(request_ref).await
            })
            .await;

        let meta = CallMeta {
            elapsed: started.elapsed(),
            from_cache: false,
        };
        match result {
            Ok(raw_hits) => {
                let hits = score_and_filter(raw_hits, &request.filter_domains, request.min_score);
                let results = SearchResults {
                    query: request.query.clone(),
                    total: hits.len(),
                    hits,
                };
                self.cache.set(&request.query, results.clone());
                tracing::debug!(
                    query = %request.query,
                    total = results.total,
                    elapsed_ms = meta.elapsed.as_millis() as u64,
                    "search completed"
                );
                CallOutcome::success(results, meta)
            }
            Err(err) => {
                tracing::warn!(query = %request.query, error = %err, "search failed");
                CallOutcome::failure(err.to_string(), meta)
            }
        }
    }
}

/// Scores, filters, and sorts raw hits.
///
/// Every hit starts at 1.0. With filter domains present, a URL matching
/// any of them gains 1.0 and every other URL loses 0.5. Hits below
/// `min_score` are dropped and the rest are sorted by descending score.
fn score_and_filter(
    mut hits: Vec<SearchHit>,
    filter_domains: &[String],
    min_score: f64,
) -> Vec<SearchHit> {
    for hit in &mut hits {
        hit.score = 1.0;
        if !filter_domains.is_empty() {
            if filter_domains.iter().any(|domain| hit.url.contains(domain)) {
                hit.score += 1.0;
            } else {
                hit.score -= 0.5;
            }
        }
    }

    let mut kept: Vec<SearchHit> = hits.into_iter().filter(|h| h.score >= min_score).collect();
    kept.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    kept
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    web: WebResults,
}

#[derive(Debug, Default, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResultItem>,
}

#[derive(Debug, Deserialize)]
struct WebResultItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn hit(url: &str) -> SearchHit {
        SearchHit {
            title: "t".to_string(),
            url: url.to_string(),
            snippet: "s".to_string(),
            score: 0.0,
            source: None,
        }
    }

    fn test_config() -> AppConfig {
        AppConfig::new()
            .with_openrouter_api_key("sk-or-test")
            .with_replicate_api_token("r8-test")
            .with_brave_api_key("bsa-test")
            .with_max_retries(0)
            .with_initial_backoff(Duration::from_millis(1))
            .with_request_timeout(Duration::from_secs(2))
    }

    #[test]
    fn test_scoring_baseline_without_filters() {
        let scored = score_and_filter(vec![hit("https://a.dev"), hit("https://b.dev")], &[], 0.0);
        assert_eq!(scored.len(), 2);
        assert!(scored.iter().all(|h| (h.score - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_scoring_boosts_matching_domains() {
        let scored = score_and_filter(
            vec![hit("https://blog.rust-lang.org/post"), hit("https://other.dev")],
            &["rust-lang.org".to_string()],
            0.0,
        );
        // Matching hit is boosted to 2.0 and sorted first.
        assert!((scored[0].score - 2.0).abs() < f64::EPSILON);
        assert!(scored[0].url.contains("rust-lang.org"));
        assert!((scored[1].score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scoring_filters_below_min_score() {
        let scored = score_and_filter(
            vec![hit("https://blog.rust-lang.org/post"), hit("https://other.dev")],
            &["rust-lang.org".to_string()],
            1.0,
        );
        assert_eq!(scored.len(), 1);
        assert!(scored[0].url.contains("rust-lang.org"));
    }

    #[test]
    fn test_request_builder() {
        let request = SearchRequest::new("rust async")
            .with_num_results(3)
            .with_filter_domains(vec!["rust-lang.org".to_string()])
            .with_min_score(0.5);
        assert_eq!(request.num_results, 3);
        assert_eq!(request.filter_domains.len(), 1);
        assert!((request.min_score - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_placeholder_key_fails_before_network() {
        let config = test_config().with_brave_api_key("your_brave_api_key_here");
        let client = BraveSearchClient::new(&config);

        let outcome = client.search(SearchRequest::new("anything")).await;
        assert!(!outcome.is_success());
        assert!(outcome.error().unwrap().contains("not configured"));
        assert_eq!(client.limiter().current_load(), 0);
    }

    #[tokio::test]
    async fn test_cache_short_circuits_network() {
        let config = test_config().with_brave_search_url("http://127.0.0.1:65535");
        let client = BraveSearchClient::new(&config);

        let seeded = SearchResults {
            query: "rust async".to_string(),
            hits: vec![hit("https://a.dev")],
            total: 1,
        };
        client.cache().set("rust async", seeded);

        let outcome = client.search(SearchRequest::new("rust async")).await;
        assert!(outcome.is_success());
        assert!(outcome.meta.from_cache);
        assert_eq!(outcome.payload().unwrap().total, 1);
        // The dead endpoint was never contacted.
        assert_eq!(client.limiter().current_load(), 0);
    }

    #[tokio::test]
    async fn test_connection_error_returns_failure_outcome() {
        let config = test_config().with_brave_search_url("http://127.0.0.1:65535");
        let client = BraveSearchClient::new(&config);

        let outcome = client.search(SearchRequest::new("unreachable")).await;
        assert!(!outcome.is_success());
        assert!(!outcome.meta.from_cache);
        // A failed search is not cached.
        assert!(client.cache().get("unreachable").is_none());
    }

    #[test]
    fn test_api_response_parsing_defaults() {
        let parsed: ApiResponse = serde_json::from_str("{}").expect("parses empty body");
        assert!(parsed.web.results.is_empty());

        let body = r#"{"web": {"results": [{"title": "T", "url": "https://a.dev", "description": "D"}]}}"#;
        let parsed: ApiResponse = serde_json::from_str(body).expect("parses results");
        assert_eq!(parsed.web.results.len(), 1);
        assert_eq!(parsed.web.results[0].url, "https://a.dev");
    }
}
