//! One provider in the fallback chain, with its limiter, retry policy, and timeout.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use intercept_sources::{
    EphemerisSource, Provision, RetryPolicy, SourceError, SourceFuture, TokenBucket,
};
use tokio::time::Instant;

/// Why a slot call produced no value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CallError {
    Source(SourceError),
    /// The caller's overall budget ran out before the provider answered.
    DeadlineExceeded,
}

impl From<SourceError> for CallError {
    fn from(err: SourceError) -> Self {
        CallError::Source(err)
    }
}

/// A provider together with the policies applied to every call made to it.
pub struct SourceSlot {
    id: String,
    source: Option<Arc<dyn EphemerisSource>>,
    limiter: Arc<TokenBucket>,
    retry: RetryPolicy,
    call_timeout: Duration,
    disabled: OnceLock<SourceError>,
}

impl SourceSlot {
    pub fn new(source: Arc<dyn EphemerisSource>) -> Self {
        Self {
            id: source.id().to_string(),
            source: Some(source),
            limiter: Arc::new(TokenBucket::unlimited()),
            retry: RetryPolicy::none(),
            call_timeout: Duration::from_secs(30),
            disabled: OnceLock::new(),
        }
    }

    /// A configured provider that could not be constructed; every call reports `err`.
    pub fn unavailable(id: impl Into<String>, err: SourceError) -> Self {
        let disabled = OnceLock::new();
        let _ = disabled.set(err);
        Self {
            id: id.into(),
            source: None,
            limiter: Arc::new(TokenBucket::unlimited()),
            retry: RetryPolicy::none(),
            call_timeout: Duration::ZERO,
            disabled,
        }
    }

    pub fn with_limiter(mut self, limiter: Arc<TokenBucket>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provision(&self) -> Option<Provision> {
        self.source.as_ref().map(|source| source.provision())
    }

    /// Error the slot was switched off with, if it was.
    pub fn disabled(&self) -> Option<&SourceError> {
        self.disabled.get()
    }

    /// Run `op` against the provider under the slot's policies and the caller's `deadline`.
    pub(crate) async fn call<'s, T, F>(
        &'s self,
        deadline: Instant,
        op: F,
    ) -> Result<T, CallError>
    where
        F: Fn(&'s dyn EphemerisSource) -> SourceFuture<'s, T>,
    {
        self.call_with(deadline, self.retry, op).await
    }

    pub(crate) async fn call_with<'s, T, F>(
        &'s self,
        deadline: Instant,
        retry: RetryPolicy,
        op: F,
    ) -> Result<T, CallError>
    where
        F: Fn(&'s dyn EphemerisSource) -> SourceFuture<'s, T>,
    {
        if let Some(err) = self.disabled() {
            return Err(err.clone().into());
        }
        let Some(source) = self.source.as_deref() else {
            return Err(SourceError::Unavailable(format!("{} is not configured", self.id)).into());
        };

        let mut attempt = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(CallError::DeadlineExceeded);
            }
            let result = match self.limiter.acquire_within(remaining).await {
                Ok(()) => self.attempt(source, deadline, &op).await?,
                Err(throttled) => Err(throttled),
            };
            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if matches!(err, SourceError::AuthRequired(_)) {
                let _ = self.disabled.set(err.clone());
                tracing::warn!(source = %self.id, %err, "disabling source for this run");
                return Err(err.into());
            }
            if !retry.should_retry(attempt, &err) {
                return Err(err.into());
            }
            let backoff = retry.backoff(attempt, &err);
            if backoff >= deadline.saturating_duration_since(Instant::now()) {
                return Err(err.into());
            }
            tracing::debug!(
                source = %self.id,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                %err,
                "retrying after transient failure"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// One timed provider call. The outer `Err` is reserved for deadline expiry.
    async fn attempt<'s, T, F>(
        &'s self,
        source: &'s dyn EphemerisSource,
        deadline: Instant,
        op: &F,
    ) -> Result<Result<T, SourceError>, CallError>
    where
        F: Fn(&'s dyn EphemerisSource) -> SourceFuture<'s, T>,
    {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let limit = self.call_timeout.min(remaining);
        match tokio::time::timeout(limit, op(source)).await {
            Ok(result) => Ok(result),
            Err(_) if limit < self.call_timeout => Err(CallError::DeadlineExceeded),
            Err(_) => Ok(Err(SourceError::Unavailable(format!(
                "{} did not answer within {}s",
                self.id,
                self.call_timeout.as_secs_f64()
            )))),
        }
    }
}

impl std::fmt::Debug for SourceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSlot")
            .field("id", &self.id)
            .field("retry", &self.retry)
            .field("call_timeout", &self.call_timeout)
            .field("disabled", &self.disabled.get())
            .finish()
    }
}
