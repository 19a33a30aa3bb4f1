//! API Ninjas animals client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{AnimalDataSource, SourceError};
use crate::catalog::Animal;
use crate::http_client::{HttpTimeouts, build_http_client};
use crate::retry::{RetryPolicy, run_with_retry};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.api-ninjas.com";

/// The endpoint returns a list, but a single match may come back bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnimalsResponse {
    Many(Vec<Animal>),
    One(Animal),
}

impl From<AnimalsResponse> for Vec<Animal> {
    fn from(response: AnimalsResponse) -> Self {
        match response {
            AnimalsResponse::Many(animals) => animals,
            AnimalsResponse::One(animal) => vec![animal],
        }
    }
}

/// Fetches animals by name prefix from `GET {base}/v1/animals?name={prefix}`.
pub struct NinjasClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry_policy: RetryPolicy,
}

impl NinjasClient {
    /// Creates a client against the public API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Client`] if HTTP client construction fails.
    pub fn new(api_key: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, timeouts)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Client`] if HTTP client construction fails.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, SourceError> {
        let client = build_http_client("animals", timeouts)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    async fn fetch_once(&self, prefix: &str) -> Result<Vec<Animal>, SourceError> {
        let url = format!(
            "{}/v1/animals?name={}",
            self.base_url,
            urlencoding::encode(prefix)
        );
        debug!(api_url = %url, "calling animals API");

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| SourceError::Network {
                prefix: prefix.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                prefix: prefix.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| SourceError::Network {
            prefix: prefix.to_string(),
            message: e.to_string(),
        })?;
        let parsed: AnimalsResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::InvalidResponse {
                prefix: prefix.to_string(),
                message: e.to_string(),
            })?;
        Ok(parsed.into())
    }
}

impl std::fmt::Debug for NinjasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NinjasClient")
            .field("base_url", &self.base_url)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AnimalDataSource for NinjasClient {
    #[instrument(skip(self), fields(source = "api-ninjas"))]
    async fn fetch_by_prefix(&self, prefix: &str) -> Result<Vec<Animal>, SourceError> {
        let label = format!("animals:{prefix}");
        let animals = run_with_retry(&self.retry_policy, &label, || self.fetch_once(prefix)).await?;
        debug!(count = animals.len(), "animals fetched");
        Ok(animals)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    fn client(base_url: String) -> NinjasClient {
        NinjasClient::with_base_url("test-key", base_url, HttpTimeouts::default())
            .unwrap()
            .with_retry_policy(RetryPolicy::linear(3, Duration::from_millis(1)))
    }

    // ==================== Serde Deserialization Tests ====================

    #[test]
    fn test_response_accepts_list_or_single_object() {
        let many: AnimalsResponse =
            serde_json::from_str(r#"[{"name":"Aardvark"},{"name":"Alpaca"}]"#).unwrap();
        assert_eq!(Vec::<Animal>::from(many).len(), 2);

        let one: AnimalsResponse = serde_json::from_str(r#"{"name":"Aardvark"}"#).unwrap();
        let animals: Vec<Animal> = one.into();
        assert_eq!(animals[0].name, "Aardvark");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = NinjasClient::new("secret", HttpTimeouts::default()).unwrap();
        assert!(!format!("{client:?}").contains("secret"));
    }

    // ==================== HTTP Tests ====================

    #[tokio::test]
    async fn test_fetch_by_prefix_sends_key_and_query() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/v1/animals"))
            .and(query_param("name", "a"))
            .and(header("X-Api-Key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Aardvark", "taxonomy": {"scientific_name": "Orycteropus afer"}},
                {"name": "Alpaca"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let animals = client(mock_server.uri()).fetch_by_prefix("a").await.unwrap();
        assert_eq!(animals.len(), 2);
        assert_eq!(animals[0].scientific_name(), Some("Orycteropus afer"));
    }

    #[tokio::test]
    async fn test_fetch_by_prefix_retries_server_errors() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/v1/animals"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/animals"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"name": "Bison"}])))
            .mount(&mock_server)
            .await;

        let animals = client(mock_server.uri()).fetch_by_prefix("b").await.unwrap();
        assert_eq!(animals[0].name, "Bison");
    }

    #[tokio::test]
    async fn test_fetch_by_prefix_does_not_retry_auth_failure() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/v1/animals"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = client(mock_server.uri()).fetch_by_prefix("c").await.unwrap_err();
        assert!(matches!(err, SourceError::HttpStatus { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_fetch_by_prefix_invalid_json() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/v1/animals"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let err = client(mock_server.uri()).fetch_by_prefix("d").await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse { .. }));
    }
}
