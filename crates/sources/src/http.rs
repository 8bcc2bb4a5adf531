//! Shared HTTP response helpers for provider clients.
//!
//! Centralizes status-code mapping so each adapter only builds requests and
//! decodes bodies.

use std::time::Duration;

use crate::error::SourceError;

/// Map an HTTP response onto the provider error taxonomy.
///
/// - **401 / 403** → [`SourceError::AuthRequired`]
/// - **404** → [`SourceError::NotFound`]
/// - **429** → [`SourceError::RateLimited`] with `Retry-After` seconds when present
/// - any other non-success → [`SourceError::Unavailable`] with the status and body
pub(crate) async fn check_response(
    provider: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    match status.as_u16() {
        401 | 403 => Err(SourceError::AuthRequired(format!(
            "{provider} rejected the request ({status})"
        ))),
        404 => Err(SourceError::NotFound(format!("{provider} returned {status}"))),
        429 => Err(SourceError::RateLimited {
            retry_after: parse_retry_after(&resp),
        }),
        _ => {
            let body = resp.text().await.unwrap_or_default();
            Err(SourceError::Unavailable(format!(
                "{provider} returned {status}: {}",
                truncate(&body, 200)
            )))
        }
    }
}

/// Parse the `Retry-After` header as whole seconds.
fn parse_retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Client shared by all requests of one adapter.
pub(crate) fn build_client(
    timeout: Duration,
    cookies: bool,
) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .cookie_store(cookies)
        .user_agent(concat!("intercept-planner/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| SourceError::Unavailable(format!("failed to build HTTP client: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body("")
                .unwrap(),
        )
    }

    fn mock_response_with_retry_after(status: u16, value: &str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .header("Retry-After", value)
                .body("")
                .unwrap(),
        )
    }

    #[test]
    fn parse_retry_after_from_header() {
        let resp = mock_response_with_retry_after(429, "120");
        assert_eq!(parse_retry_after(&resp), Some(Duration::from_secs(120)));
    }

    #[test]
    fn parse_retry_after_non_numeric() {
        let resp = mock_response_with_retry_after(429, "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(&resp), None);
    }

    #[tokio::test]
    async fn rate_limited_with_header() {
        let resp = mock_response_with_retry_after(429, "30");
        let err = check_response("horizons", resp).await.unwrap_err();
        assert_eq!(
            err,
            SourceError::RateLimited {
                retry_after: Some(Duration::from_secs(30))
            }
        );
    }

    #[tokio::test]
    async fn auth_and_not_found_statuses() {
        let err = check_response("space_track", mock_response(401)).await.unwrap_err();
        assert!(matches!(err, SourceError::AuthRequired(_)));
        let err = check_response("space_track", mock_response(403)).await.unwrap_err();
        assert!(matches!(err, SourceError::AuthRequired(_)));
        let err = check_response("mpc", mock_response(404)).await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let err = check_response("mpc", mock_response(503)).await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn success_passes_through() {
        assert!(check_response("mpc", mock_response(200)).await.is_ok());
    }
}
