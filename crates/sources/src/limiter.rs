//! Per-provider token bucket shared by every request to that provider.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::SourceError;

/// Longest refill wait reported back to callers as a `Retry-After` hint.
const MAX_RETRY_HINT: Duration = Duration::from_secs(3_600);

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with a bounded acquisition wait.
///
/// Starts full. A caller that cannot obtain a token within its wait budget
/// gets [`SourceError::RateLimited`] instead of blocking indefinitely.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    max_wait: Duration,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_second: f64, max_wait: Duration) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            refill_per_second,
            max_wait,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// A bucket that never throttles; used for in-process sources.
    pub fn unlimited() -> Self {
        Self::new(u32::MAX, f64::from(u32::MAX), Duration::ZERO)
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Take one token, waiting at most the configured `max_wait`.
    pub async fn acquire(&self) -> Result<(), SourceError> {
        self.acquire_within(self.max_wait).await
    }

    /// Take one token, waiting at most `min(budget, max_wait)`.
    pub async fn acquire_within(&self, budget: Duration) -> Result<(), SourceError> {
        let window = budget.min(self.max_wait);
        let started = Instant::now();
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_per_second).min(self.capacity);
                state.last_refill = now;
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(());
                }
                if self.refill_per_second <= 0.0 {
                    return Err(SourceError::RateLimited { retry_after: None });
                }
                Duration::try_from_secs_f64((1.0 - state.tokens) / self.refill_per_second)
                    .unwrap_or(Duration::MAX)
            };
            if wait > window.saturating_sub(started.elapsed()) {
                tracing::debug!(wait_ms = wait.as_millis() as u64, "token bucket exhausted");
                return Err(SourceError::RateLimited {
                    retry_after: Some(wait.min(MAX_RETRY_HINT)),
                });
            }
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_up_to_capacity_then_starves_without_wait_budget() {
        let bucket = TokenBucket::new(2, 1.0, Duration::ZERO);
        assert!(bucket.acquire().await.is_ok());
        assert!(bucket.acquire().await.is_ok());
        let err = bucket.acquire().await.unwrap_err();
        assert!(matches!(err, SourceError::RateLimited { retry_after: Some(_) }));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_refill_within_budget() {
        let bucket = TokenBucket::new(1, 2.0, Duration::from_secs(1));
        bucket.acquire().await.unwrap();
        let started = Instant::now();
        bucket.acquire().await.unwrap();
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(500), "waited {waited:?}");
        assert!(waited < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn caller_budget_caps_the_wait() {
        let bucket = TokenBucket::new(1, 0.1, Duration::from_secs(60));
        bucket.acquire().await.unwrap();
        let err = bucket.acquire_within(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, SourceError::RateLimited { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn vanishing_refill_rates_report_a_bounded_hint() {
        let bucket = TokenBucket::new(1, 1e-300, Duration::from_secs(u64::MAX));
        bucket.acquire().await.unwrap();
        let err = bucket.acquire().await.unwrap_err();
        assert_eq!(
            err,
            SourceError::RateLimited {
                retry_after: Some(MAX_RETRY_HINT)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn refills_after_idle_period() {
        let bucket = TokenBucket::new(3, 1.0, Duration::ZERO);
        for _ in 0..3 {
            bucket.acquire().await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(3)).await;
        for _ in 0..3 {
            bucket.acquire().await.unwrap();
        }
        assert!(bucket.acquire().await.is_err());
    }
}
