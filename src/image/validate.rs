//! Reachability check for the selected image.
//!
//! A HEAD probe that gets any HTTP response counts as reachable, including
//! 4xx/5xx. This can pass broken links; it is kept because tightening it would
//! change which images get shown. Only when the probe cannot reach the server
//! does a full GET with a hard timeout decide.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument, warn};

use super::ImageError;
use crate::http_client::{HttpTimeouts, build_http_client};

/// Hard limit on the fallback image load.
pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Decides whether an image URL is loadable. Never fails.
#[async_trait]
pub trait ImageValidator: Send + Sync {
    async fn validate(&self, url: &str) -> bool;
}

/// HTTP-backed [`ImageValidator`].
#[derive(Debug, Clone)]
pub struct HttpImageValidator {
    client: Client,
    fallback_timeout: Duration,
}

impl HttpImageValidator {
    /// # Errors
    ///
    /// Returns [`ImageError::Client`] if HTTP client construction fails.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, ImageError> {
        Ok(Self {
            client: build_http_client("image-validator", timeouts)?,
            fallback_timeout: FALLBACK_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    /// GETs the image and accepts a 2xx whose content type, if any, is `image/*`.
    ///
    /// The whole load, body included, is bounded by the fallback timeout.
    async fn fallback_load(&self, url: &str) -> bool {
        match tokio::time::timeout(self.fallback_timeout, self.load_image(url)).await {
            Ok(Ok(loaded)) => loaded,
            Ok(Err(error)) => {
                debug!(error = %error, "fallback load failed");
                false
            }
            Err(_) => {
                debug!(timeout_ms = self.fallback_timeout.as_millis(), "fallback load timed out");
                false
            }
        }
    }

    async fn load_image(&self, url: &str) -> Result<bool, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let is_image = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"));
        if !is_image {
            return Ok(false);
        }
        let body = response.bytes().await?;
        debug!(bytes = body.len(), "fallback load complete");
        Ok(true)
    }
}

#[async_trait]
impl ImageValidator for HttpImageValidator {
    #[instrument(skip(self))]
    async fn validate(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => {
                debug!(status = response.status().as_u16(), "probe answered");
                true
            }
            Err(error) => {
                debug!(error = %error, "probe failed, trying full load");
                let ok = self.fallback_load(url).await;
                if !ok {
                    warn!(url, "image failed validation");
                }
                ok
            }
        }
    }
}
