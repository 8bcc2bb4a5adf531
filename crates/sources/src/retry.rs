//! Retry policy for transient provider failures.

use std::time::Duration;

use crate::error::SourceError;

/// Bounded exponential backoff.
///
/// Attempt `k` (zero-based) waits `base_backoff · 2^k`, capped at
/// `max_backoff`, and never less than a server-provided `Retry-After`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retry_count: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 2,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retry_count: 0,
            ..Self::default()
        }
    }

    /// Whether a failed attempt (`attempt` starts at 0) should be repeated.
    pub fn should_retry(&self, attempt: u32, err: &SourceError) -> bool {
        err.is_transient() && attempt < self.retry_count
    }

    /// Wait before the retry that follows failed attempt `attempt`.
    pub fn backoff(&self, attempt: u32, err: &SourceError) -> Duration {
        let exponential = self
            .base_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_backoff);
        match err {
            SourceError::RateLimited {
                retry_after: Some(hint),
            } => exponential.max(*hint),
            _ => exponential,
        }
    }
}
