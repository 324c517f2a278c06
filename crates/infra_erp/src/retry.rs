//! Retry policy for the import endpoint
//!
//! Only gateway statuses (502, 503, 504) and transport failures are retried.
//! The delay before each retry comes from a [`Backoff`], injected into the
//! client so tests can run without sleeping.

use std::time::Duration;

use reqwest::StatusCode;

/// Delay before retry number `attempt` (starting at 1)
pub trait Backoff: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

impl<F> Backoff for F
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: u32) -> Duration {
        self(attempt)
    }
}

/// `2^attempt` seconds: 2, 4, 8, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialBackoff;

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(1u64 << attempt.min(16))
    }
}

/// Retries immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Backoff for NoDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Statuses worth retrying
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}
