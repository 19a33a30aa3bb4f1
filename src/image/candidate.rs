//! Candidate and cache record types.

use serde::{Deserialize, Serialize};

/// Declared pixel size of a search result. Either side may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
}

impl ImageDimensions {
    #[must_use]
    pub fn new(width: u64, height: u64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

/// One image search result under consideration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCandidate {
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ImageDimensions>,
    /// Hostname the result was found on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Query that produced this result.
    #[serde(default)]
    pub query: String,
    /// Set by the scorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

impl ImageCandidate {
    /// Creates an unscored candidate with only a link and originating query.
    #[must_use]
    pub fn new(link: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            mime: None,
            title: None,
            snippet: None,
            dimensions: None,
            source: None,
            query: query.into(),
            score: None,
        }
    }

    #[must_use]
    pub fn with_dimensions(mut self, width: u64, height: u64) -> Self {
        self.dimensions = Some(ImageDimensions::new(width, height));
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    #[must_use]
    pub fn width(&self) -> Option<u64> {
        self.dimensions.and_then(|d| d.width)
    }

    #[must_use]
    pub fn height(&self) -> Option<u64> {
        self.dimensions.and_then(|d| d.height)
    }
}

/// Persisted outcome of one resolution.
///
/// `selected` is `None` when nothing was found or the top candidate failed
/// validation. `timestamp` is epoch milliseconds at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub selected: Option<String>,
    #[serde(default)]
    pub candidates: Vec<ImageCandidate>,
    pub timestamp: i64,
}
