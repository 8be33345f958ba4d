use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use dealradar_common::SearchResult;

// --- SearchError ---

/// Typed failure for the search path. Recovered locally by falling back to
/// the offer catalog; never surfaced raw to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("search request timed out")]
    Timeout,
    #[error("search provider rate limited the request")]
    RateLimited,
    #[error("search provider unavailable: {0}")]
    Unavailable(String),
    #[error("malformed search response: {0}")]
    MalformedResponse(String),
}

impl SearchError {
    /// Transient failures are worth another attempt; a malformed body is
    /// terminal since the provider answered and retrying reads the same
    /// contract mismatch.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SearchError::MalformedResponse(_))
    }
}

// --- WebSearcher trait ---

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// One search attempt. Zero hits is `Ok(vec![])`, not an error — callers
    /// must distinguish "no results" from "search failed".
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

// --- Serper (Google Search) ---

const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";

pub struct SerperSearcher {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl SerperSearcher {
    pub fn new(api_key: &str, request_timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl WebSearcher for SerperSearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let body = serde_json::json!({
            "q": query,
            "num": max_results,
        });

        let resp = self
            .client
            .post(SERPER_ENDPOINT)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            return Err(SearchError::Unavailable(format!("status {status}")));
        }

        let data: SerperResponse = resp
            .json()
            .await
            .map_err(|e| SearchError::MalformedResponse(e.to_string()))?;

        let results: Vec<SearchResult> = data
            .organic
            .into_iter()
            .map(|r| SearchResult {
                url: r.link,
                title: r.title,
                snippet: r.snippet,
            })
            .collect();

        info!(query, count = results.len(), "Serper search complete");
        Ok(results)
    }
}

fn classify_request_error(err: reqwest::Error) -> SearchError {
    if err.is_timeout() {
        SearchError::Timeout
    } else {
        SearchError::Unavailable(err.to_string())
    }
}

// --- SearchClient (retry wrapper) ---

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub max_results: usize,
    pub max_attempts: u32,
    /// Base backoff between attempts. Actual delay is base * 2^attempt
    /// plus random jitter (0-500ms).
    pub retry_base: Duration,
    /// Budget for the whole retry loop. Exceeding it converts to
    /// `SearchError::Timeout` so one cycle cannot stall indefinitely.
    pub overall_budget: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 20,
            max_attempts: 3,
            retry_base: Duration::from_secs(1),
            overall_budget: Duration::from_secs(45),
        }
    }
}

/// Wraps any `WebSearcher` with the bounded-retry policy.
pub struct SearchClient {
    searcher: Arc<dyn WebSearcher>,
    config: SearchConfig,
}

impl SearchClient {
    pub fn new(searcher: Arc<dyn WebSearcher>, config: SearchConfig) -> Self {
        Self { searcher, config }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        match tokio::time::timeout(self.config.overall_budget, self.search_with_retry(query)).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    query,
                    budget_ms = self.config.overall_budget.as_millis() as u64,
                    "Search budget exhausted"
                );
                Err(SearchError::Timeout)
            }
        }
    }

    async fn search_with_retry(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let mut attempt = 0u32;
        loop {
            match self.searcher.search(query, self.config.max_results).await {
                Ok(hits) => return Ok(hits),
                Err(err) if err.is_transient() && attempt + 1 < self.config.max_attempts => {
                    let backoff = self.config.retry_base * 2u32.pow(attempt);
                    let jitter = Duration::from_millis(rand::rng().random_range(0..500));
                    warn!(
                        query,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Search attempt failed, retrying after backoff"
                    );
                    tokio::time::sleep(backoff + jitter).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(query, attempts = attempt + 1, error = %err, "Search failed");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{search_hit, MockSearcher};

    fn fast_config(max_attempts: u32) -> SearchConfig {
        SearchConfig {
            max_results: 10,
            max_attempts,
            retry_base: Duration::from_millis(1),
            overall_budget: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn transient_errors_retry_until_success() {
        let searcher = Arc::new(
            MockSearcher::new()
                .then_err(SearchError::RateLimited)
                .then_err(SearchError::Unavailable("status 503".to_string()))
                .then_ok(vec![search_hit(
                    "AWS voucher 2025",
                    "20% off",
                    "https://aws.amazon.com/certification/",
                )]),
        );
        let client = SearchClient::new(searcher.clone(), fast_config(3));

        let hits = client.search("aws deals").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(searcher.calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_attempts_return_last_error() {
        let searcher = Arc::new(
            MockSearcher::new()
                .then_err(SearchError::Unavailable("status 500".to_string()))
                .then_err(SearchError::Unavailable("status 502".to_string()))
                .then_err(SearchError::RateLimited),
        );
        let client = SearchClient::new(searcher.clone(), fast_config(3));

        let err = client.search("aws deals").await.unwrap_err();
        assert_eq!(err, SearchError::RateLimited);
        assert_eq!(searcher.calls(), 3);
    }

    #[tokio::test]
    async fn malformed_response_is_not_retried() {
        let searcher = Arc::new(
            MockSearcher::new()
                .then_err(SearchError::MalformedResponse("missing organic".to_string()))
                .then_ok(vec![]),
        );
        let client = SearchClient::new(searcher.clone(), fast_config(3));

        let err = client.search("aws deals").await.unwrap_err();
        assert!(matches!(err, SearchError::MalformedResponse(_)));
        assert_eq!(searcher.calls(), 1);
    }

    #[tokio::test]
    async fn zero_hits_is_success_not_error() {
        let searcher = Arc::new(MockSearcher::new().then_ok(vec![]));
        let client = SearchClient::new(searcher.clone(), fast_config(3));

        let hits = client.search("obscure topic").await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(searcher.calls(), 1);
    }

    #[tokio::test]
    async fn budget_exhaustion_converts_to_timeout() {
        let searcher = Arc::new(
            MockSearcher::new()
                .with_delay(Duration::from_millis(50))
                .then_err(SearchError::Unavailable("status 500".to_string()))
                .then_err(SearchError::Unavailable("status 500".to_string()))
                .then_err(SearchError::Unavailable("status 500".to_string())),
        );
        let client = SearchClient::new(
            searcher,
            SearchConfig {
                max_results: 10,
                max_attempts: 3,
                retry_base: Duration::from_millis(1),
                overall_budget: Duration::from_millis(20),
            },
        );

        let err = client.search("slow provider").await.unwrap_err();
        assert_eq!(err, SearchError::Timeout);
    }
}
