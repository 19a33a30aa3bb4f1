//! Retry policy shared by every network-calling component.
//!
//! This module provides the [`RetryPolicy`], [`Backoff`] and [`FailureType`]
//! types, plus [`run_with_retry`] which drives any async operation whose error
//! implements [`Retryable`].
//!
//! # Overview
//!
//! When a request fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - Temporary failures that may succeed on retry
//! - [`FailureType::RateLimited`] - Server rate limiting (HTTP 429), retried with backoff
//! - [`FailureType::Permanent`] - Failures that won't succeed regardless of retries
//!
//! The [`RetryPolicy`] then decides whether to retry based on failure type and
//! attempt count, computing the delay from its [`Backoff`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use animal_catalog_core::retry::{FailureType, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::linear(3, Duration::from_millis(1000));
//!
//! match policy.should_retry(FailureType::RateLimited, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(delay, Duration::from_millis(1000));
//!         assert_eq!(attempt, 2);
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument, warn};

/// Default maximum attempts (including the initial attempt).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to exponential delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Step used by the image search linear backoff (1s, 2s, ...).
pub const SEARCH_BACKOFF_STEP: Duration = Duration::from_millis(1000);

/// Classification of request failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, 5xx server errors, connection refused.
    Transient,

    /// Server rate limiting (HTTP 429).
    RateLimited,

    /// Permanent failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, 400 Bad Request, malformed response body.
    Permanent,
}

/// Errors that know how they should be retried.
pub trait Retryable {
    /// Classifies this error for retry decisions.
    fn failure_type(&self) -> FailureType;
}

/// Decision on whether to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// How long to wait between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// `step * attempt` where `attempt` is the attempt that just failed.
    Linear {
        /// Delay added per failed attempt.
        step: Duration,
    },
    /// `min(base * multiplier^(attempt - 1), max)` plus optional jitter.
    Exponential {
        /// Delay for the first retry.
        base: Duration,
        /// Delay cap.
        max: Duration,
        /// Growth factor per attempt.
        multiplier: f32,
        /// Add up to 500ms of random jitter.
        jitter: bool,
    },
}

impl Backoff {
    /// Computes the delay after `attempt` (1-indexed) has failed.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Linear { step } => step.saturating_mul(attempt),
            Self::Exponential {
                base,
                max,
                multiplier,
                jitter,
            } => {
                let base_ms = base.as_millis() as f64;
                let exponent = f64::from(attempt.saturating_sub(1));
                let delay_ms = base_ms * f64::from(*multiplier).powf(exponent);
                let capped_ms = delay_ms.min(max.as_millis() as f64);
                let delay = Duration::from_millis(capped_ms as u64);
                if *jitter {
                    delay + random_jitter()
                } else {
                    delay
                }
            }
        }
    }
}

/// Generates random jitter between 0 and `MAX_JITTER`.
#[allow(clippy::cast_possible_truncation)]
fn random_jitter() -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_ms = rng.gen_range(0..=MAX_JITTER.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

/// Configuration for retry behavior.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `backoff`: exponential, 1s base, 32s cap, x2, with jitter
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay schedule between attempts.
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::Exponential {
                base: DEFAULT_BASE_DELAY,
                max: DEFAULT_MAX_DELAY,
                multiplier: DEFAULT_BACKOFF_MULTIPLIER,
                jitter: true,
            },
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy with an explicit backoff schedule.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Creates a linear policy: wait `step * attempt` after each failure.
    #[must_use]
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self::new(max_attempts, Backoff::Linear { step })
    }

    /// The policy used by the image search: 3 attempts, 1s/2s linear waits.
    #[must_use]
    pub fn image_search() -> Self {
        Self::linear(DEFAULT_MAX_ATTEMPTS, SEARCH_BACKOFF_STEP)
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff schedule.
    #[must_use]
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Determines whether to retry a failed request.
    ///
    /// `attempt` is the attempt number that just failed (1-indexed).
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.backoff.delay_for(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or exhausts the policy.
///
/// `label` only feeds log lines. The last error is returned on give-up.
pub async fn run_with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => match policy.should_retry(error.failure_type(), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    debug!(label, attempt, error = %error, delay_ms = delay.as_millis(), "retrying");
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(label, attempt, error = %error, %reason, "giving up");
                    return Err(error);
                }
            },
        }
    }
}

/// Classifies an HTTP status code into a failure type.
///
/// | Status | Type |
/// |--------|------|
/// | 408 | Transient |
/// | 429 | RateLimited |
/// | other 4xx | Permanent |
/// | 5xx | Transient |
/// | anything else | Permanent |
#[must_use]
#[allow(clippy::match_same_arms)]
pub fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient,
        429 => FailureType::RateLimited,
        status if (400..500).contains(&status) => FailureType::Permanent,
        status if (500..600).contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}
