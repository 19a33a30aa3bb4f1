//! Image search backend and the multi-query candidate fetcher.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, instrument, warn};

use super::{ImageCandidate, ImageDimensions, ImageError};
use crate::http_client::{HttpTimeouts, build_http_client};
use crate::retry::{RetryPolicy, run_with_retry};

/// Default search API base URL.
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://www.googleapis.com";

/// Results requested per query, and the total after which the fetcher stops.
pub const MAX_CANDIDATES: usize = 8;

/// A backend that turns one query into image candidates.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Runs one query. Implementations own their retry behavior.
    async fn search(&self, query: &str) -> Result<Vec<ImageCandidate>, ImageError>;
}

/// Issues `queries` in order and collects their results.
///
/// A query that fails is logged and contributes nothing. Once at least
/// [`MAX_CANDIDATES`] results have accumulated, the remaining queries are
/// not issued.
#[instrument(skip(search, queries), fields(queries = queries.len()))]
pub async fn fetch_all_candidates(search: &dyn ImageSearch, queries: &[String]) -> Vec<ImageCandidate> {
    let mut candidates = Vec::new();
    for query in queries {
        if candidates.len() >= MAX_CANDIDATES {
            debug!(collected = candidates.len(), "candidate cap reached, skipping remaining queries");
            break;
        }
        match search.search(query).await {
            Ok(found) => {
                debug!(query = %query, found = found.len(), "query returned");
                candidates.extend(found);
            }
            Err(error) => warn!(query = %query, error = %error, "image search failed; skipping query"),
        }
    }
    candidates
}

// ==================== Search API Response Types ====================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    error: Option<SearchApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    link: String,
    mime: Option<String>,
    title: Option<String>,
    snippet: Option<String>,
    display_link: Option<String>,
    image: Option<SearchItemImage>,
}

#[derive(Debug, Deserialize)]
struct SearchItemImage {
    #[serde(default, deserialize_with = "number_or_string")]
    width: Option<u64>,
    #[serde(default, deserialize_with = "number_or_string")]
    height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Accepts `640`, `"640"`, or null. Unparseable strings read as unknown.
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

impl SearchItem {
    fn into_candidate(self, query: &str) -> ImageCandidate {
        ImageCandidate {
            link: self.link,
            mime: self.mime,
            title: self.title,
            snippet: self.snippet,
            dimensions: self.image.map(|image| ImageDimensions {
                width: image.width,
                height: image.height,
            }),
            source: self.display_link,
            query: query.to_string(),
            score: None,
        }
    }
}

// ==================== GoogleImageSearch ====================

/// Credentials and endpoint for [`GoogleImageSearch`].
#[derive(Clone)]
pub struct SearchConfig {
    pub api_key: String,
    pub engine_id: String,
    pub base_url: String,
    pub retry_policy: RetryPolicy,
}

impl SearchConfig {
    /// Config for the public endpoint with the standard search retry policy.
    #[must_use]
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            retry_policy: RetryPolicy::image_search(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("engine_id", &self.engine_id)
            .field("base_url", &self.base_url)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

/// Programmable Search Engine image backend.
#[derive(Debug)]
pub struct GoogleImageSearch {
    client: Client,
    config: SearchConfig,
}

impl GoogleImageSearch {
    /// # Errors
    ///
    /// Returns [`ImageError::MissingCredentials`] when the key or engine id is
    /// blank, or [`ImageError::Client`] if HTTP client construction fails.
    pub fn new(config: SearchConfig, timeouts: HttpTimeouts) -> Result<Self, ImageError> {
        if config.api_key.trim().is_empty() {
            return Err(ImageError::MissingCredentials("search_api_key"));
        }
        if config.engine_id.trim().is_empty() {
            return Err(ImageError::MissingCredentials("search_engine_id"));
        }
        let client = build_http_client("image-search", timeouts)?;
        Ok(Self { client, config })
    }

    fn request_url(&self, query: &str) -> String {
        format!(
            "{}/customsearch/v1?q={}&cx={}&searchType=image&imgType=photo&num={}&safe=active&key={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(query),
            urlencoding::encode(&self.config.engine_id),
            MAX_CANDIDATES,
            urlencoding::encode(&self.config.api_key),
        )
    }

    async fn search_once(&self, query: &str) -> Result<Vec<ImageCandidate>, ImageError> {
        let response = self
            .client
            .get(self.request_url(query))
            .send()
            .await
            .map_err(|e| ImageError::Network {
                query: query.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::HttpStatus {
                query: query.to_string(),
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = response.json().await.map_err(|e| ImageError::InvalidResponse {
            query: query.to_string(),
            message: e.to_string(),
        })?;

        if let Some(error) = body.error {
            return Err(ImageError::Api {
                query: query.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        Ok(body
            .items
            .into_iter()
            .map(|item| item.into_candidate(query))
            .collect())
    }
}

#[async_trait]
impl ImageSearch for GoogleImageSearch {
    #[instrument(skip(self), fields(backend = "google"))]
    async fn search(&self, query: &str) -> Result<Vec<ImageCandidate>, ImageError> {
        run_with_retry(&self.config.retry_policy, query, || self.search_once(query)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    fn backend(base_url: String) -> GoogleImageSearch {
        let config = SearchConfig::new("key-123", "engine-456")
            .with_base_url(base_url)
            .with_retry_policy(RetryPolicy::linear(3, Duration::from_millis(1)));
        GoogleImageSearch::new(config, HttpTimeouts::default()).unwrap()
    }

    /// Scripted backend: per-query results, records call order.
    struct ScriptedSearch {
        results: HashMap<String, usize>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSearch {
        fn new(results: &[(&str, usize)]) -> Self {
            Self {
                results: results.iter().map(|(q, n)| ((*q).to_string(), *n)).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageSearch for ScriptedSearch {
        async fn search(&self, query: &str) -> Result<Vec<ImageCandidate>, ImageError> {
            self.calls.lock().unwrap().push(query.to_string());
            match self.results.get(query) {
                Some(&n) => Ok((0..n)
                    .map(|i| ImageCandidate::new(format!("https://x/{query}-{i}.jpg"), query))
                    .collect()),
                None => Err(ImageError::HttpStatus {
                    query: query.to_string(),
                    status: 500,
                }),
            }
        }
    }

    fn queries(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    // ==================== Fetcher Tests ====================

    #[tokio::test]
    async fn test_fetch_stops_once_cap_reached() {
        let search = ScriptedSearch::new(&[("q1", 5), ("q2", 5), ("q3", 5)]);
        let found = fetch_all_candidates(&search, &queries(&["q1", "q2", "q3"])).await;

        assert_eq!(found.len(), 10);
        assert_eq!(*search.calls.lock().unwrap(), vec!["q1", "q2"]);
    }

    #[tokio::test]
    async fn test_fetch_skips_failed_queries() {
        let search = ScriptedSearch::new(&[("ok", 2)]);
        let found = fetch_all_candidates(&search, &queries(&["broken", "ok"])).await;

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.query == "ok"));
    }

    #[tokio::test]
    async fn test_fetch_with_no_queries() {
        let search = ScriptedSearch::new(&[]);
        assert!(fetch_all_candidates(&search, &[]).await.is_empty());
        assert!(search.calls.lock().unwrap().is_empty());
    }

    // ==================== Response Parsing Tests ====================

    #[test]
    fn test_search_item_maps_to_candidate() {
        let item: SearchItem = serde_json::from_value(serde_json::json!({
            "link": "https://upload.wikimedia.org/lion.jpg",
            "mime": "image/jpeg",
            "title": "Lion",
            "snippet": "A lion",
            "displayLink": "upload.wikimedia.org",
            "image": {"width": "1024", "height": 768, "contextLink": "https://x"}
        }))
        .unwrap();

        let candidate = item.into_candidate("lion wildlife");
        assert_eq!(candidate.width(), Some(1024));
        assert_eq!(candidate.height(), Some(768));
        assert_eq!(candidate.source.as_deref(), Some("upload.wikimedia.org"));
        assert_eq!(candidate.query, "lion wildlife");
    }

    #[test]
    fn test_missing_items_is_empty() {
        let body: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(body.items.is_empty());
        assert!(body.error.is_none());
    }

    #[test]
    fn test_unparseable_dimension_is_unknown() {
        let image: SearchItemImage =
            serde_json::from_value(serde_json::json!({"width": "wide"})).unwrap();
        assert_eq!(image.width, None);
        assert_eq!(image.height, None);
    }

    #[test]
    fn test_new_rejects_blank_credentials() {
        let err = GoogleImageSearch::new(SearchConfig::new(" ", "cx"), HttpTimeouts::default())
            .unwrap_err();
        assert!(matches!(err, ImageError::MissingCredentials("search_api_key")));

        let err = GoogleImageSearch::new(SearchConfig::new("key", ""), HttpTimeouts::default())
            .unwrap_err();
        assert!(matches!(err, ImageError::MissingCredentials("search_engine_id")));
    }

    #[test]
    fn test_config_debug_hides_api_key() {
        let config = SearchConfig::new("very-secret", "cx");
        assert!(!format!("{config:?}").contains("very-secret"));
    }

    // ==================== HTTP Tests ====================

    #[tokio::test]
    async fn test_search_sends_expected_query_params() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("q", "Panthera leo species"))
            .and(query_param("cx", "engine-456"))
            .and(query_param("key", "key-123"))
            .and(query_param("searchType", "image"))
            .and(query_param("imgType", "photo"))
            .and(query_param("num", "8"))
            .and(query_param("safe", "active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "link": "https://upload.wikimedia.org/lion.jpg",
                    "displayLink": "upload.wikimedia.org",
                    "image": {"width": 1000, "height": 800}
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let found = backend(mock_server.uri())
            .search("Panthera leo species")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].query, "Panthera leo species");
    }

    #[tokio::test]
    async fn test_search_retries_rate_limit_then_succeeds() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let found = backend(mock_server.uri()).search("lion").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_search_gives_up_after_three_attempts() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&mock_server)
            .await;

        let err = backend(mock_server.uri()).search("lion").await.unwrap_err();
        assert!(matches!(err, ImageError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_search_api_error_body_is_not_retried() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "Daily Limit Exceeded"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = backend(mock_server.uri()).search("lion").await.unwrap_err();
        assert!(matches!(err, ImageError::Api { code: 403, .. }));
    }
}
