//! Provider error taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Errors an adapter can report for a single provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The provider does not know the object.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure, timeout, server error, or malformed response.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The provider (or the local limiter) asked us to back off.
    #[error("rate limited{}", retry_hint(.retry_after))]
    RateLimited {
        /// Server-provided wait, when known.
        retry_after: Option<Duration>,
    },

    /// Credentials missing or rejected.
    #[error("authentication required: {0}")]
    AuthRequired(String),
}

impl SourceError {
    /// `Unavailable` and `RateLimited` may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Unavailable(_) | SourceError::RateLimited { .. }
        )
    }

    pub(crate) fn malformed(provider: &str, detail: impl std::fmt::Display) -> Self {
        SourceError::Unavailable(format!("malformed {provider} response: {detail}"))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Unavailable(format!("request timed out: {err}"))
        } else if err.is_decode() {
            SourceError::Unavailable(format!("undecodable response body: {err}"))
        } else {
            SourceError::Unavailable(format!("transport error: {err}"))
        }
    }
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(wait) => format!(", retry after {}s", wait.as_secs()),
        None => String::new(),
    }
}
