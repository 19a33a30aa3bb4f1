//! Error types for image search.

use thiserror::Error;

use crate::http_client::ClientBuildError;
use crate::retry::{FailureType, Retryable, classify_http_status};

/// Errors returned by an [`ImageSearch`](super::ImageSearch) backend.
///
/// None of these are fatal to a resolution: the fetcher logs them and skips
/// the query that produced them.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Client(#[from] ClientBuildError),

    /// API key or engine id was not configured.
    #[error("image search is not configured: missing {0}\n  Suggestion: Set search_api_key and search_engine_id in config or pass --search-key/--search-engine")]
    MissingCredentials(&'static str),

    /// The request never produced a response.
    #[error("image search for '{query}' failed: {message}")]
    Network { query: String, message: String },

    /// Non-success HTTP status.
    #[error("image search for '{query}' returned HTTP {status}")]
    HttpStatus { query: String, status: u16 },

    /// The API returned a JSON `error` object.
    #[error("image search API error for '{query}' (code {code}): {message}")]
    Api {
        query: String,
        code: i64,
        message: String,
    },

    #[error("image search response for '{query}' could not be parsed: {message}")]
    InvalidResponse { query: String, message: String },
}

impl ImageError {
    /// True for HTTP 429.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 429, .. })
    }
}

impl Retryable for ImageError {
    fn failure_type(&self) -> FailureType {
        match self {
            Self::Network { .. } => FailureType::Transient,
            Self::HttpStatus { status, .. } => classify_http_status(*status),
            Self::Client(_)
            | Self::MissingCredentials(_)
            | Self::Api { .. }
            | Self::InvalidResponse { .. } => FailureType::Permanent,
        }
    }
}
