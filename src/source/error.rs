//! Error types for the animal data source.

use thiserror::Error;

use crate::http_client::ClientBuildError;
use crate::retry::{FailureType, Retryable, classify_http_status};

/// Errors returned by an [`AnimalDataSource`](super::AnimalDataSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP client could not be constructed.
    #[error(transparent)]
    Client(#[from] ClientBuildError),

    /// The request never produced a response.
    #[error("animal data request for '{prefix}' failed: {message}\n  Suggestion: Check your network connection")]
    Network { prefix: String, message: String },

    /// The API answered with a non-success status.
    #[error("animal data API returned HTTP {status} for '{prefix}'\n  Suggestion: {}", status_suggestion(.status))]
    HttpStatus { prefix: String, status: u16 },

    /// The body was not the expected JSON shape.
    #[error("animal data response for '{prefix}' could not be parsed: {message}")]
    InvalidResponse { prefix: String, message: String },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn status_suggestion(status: &u16) -> &'static str {
    match *status {
        401 | 403 => "Check the animals_api_key setting or --animals-key flag",
        429 => "The API rate limit was hit; try again in a minute",
        s if s >= 500 => "The animal data API is unavailable; try again later",
        _ => "Re-run with -v for request details",
    }
}

impl Retryable for SourceError {
    fn failure_type(&self) -> FailureType {
        match self {
            Self::Network { .. } => FailureType::Transient,
            Self::HttpStatus { status, .. } => classify_http_status(*status),
            Self::Client(_) | Self::InvalidResponse { .. } => FailureType::Permanent,
        }
    }
}
