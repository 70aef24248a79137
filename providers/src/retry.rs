//! Backoff for model calls.
//!
//! A motivation line is cheap to lose, so the policy is short: one retry by
//! default, on 408, 429, 5xx or a connect/timeout failure. `Retry-After`
//! (whole seconds, under 30s) replaces the computed delay.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};

const RETRY_AFTER_CEILING: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of the delay that may be shaved off at random.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay: Duration::from_millis(400),
            max_delay: Duration::from_secs(4),
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// Doubling delay for the given zero-based retry, capped and jittered.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let doubled = self
            .initial_delay
            .saturating_mul(1_u32.checked_shl(retry).unwrap_or(u32::MAX));
        let capped = doubled.min(self.max_delay);
        let shave = rand::random::<f64>() * self.jitter_factor.clamp(0.0, 1.0);
        capped.mul_f64(1.0 - shave)
    }

    fn wait_after(&self, retry: u32, headers: Option<&HeaderMap>) -> Duration {
        headers
            .and_then(retry_after)
            .unwrap_or_else(|| self.backoff(retry))
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    let wait = Duration::from_secs(secs);
    (wait > Duration::ZERO && wait < RETRY_AFTER_CEILING).then_some(wait)
}

#[must_use]
pub fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

#[derive(Debug)]
pub enum RetryOutcome {
    Success(Response),
    /// Final non-2xx response.
    HttpError(Response),
    ConnectionError {
        attempts: u32,
        source: reqwest::Error,
    },
}

/// Send the request produced by `build`, rebuilding it for every attempt.
pub async fn send_with_retry<F>(build: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let mut retry = 0;
    loop {
        let exhausted = retry >= config.max_retries;
        let wait = match build().send().await {
            Ok(response) if response.status().is_success() => {
                return RetryOutcome::Success(response);
            }
            Ok(response) => {
                if exhausted || !is_transient(response.status()) {
                    return RetryOutcome::HttpError(response);
                }
                tracing::debug!(status = %response.status(), retry, "Model call failed, retrying");
                config.wait_after(retry, Some(response.headers()))
            }
            Err(source) => {
                if exhausted || !(source.is_connect() || source.is_timeout()) {
                    return RetryOutcome::ConnectionError {
                        attempts: retry + 1,
                        source,
                    };
                }
                tracing::debug!(error = %source, retry, "Model unreachable, retrying");
                config.wait_after(retry, None)
            }
        };
        tokio::time::sleep(wait).await;
        retry += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let config = quick(3);
        assert_eq!(config.backoff(0), Duration::from_millis(1));
        assert_eq!(config.backoff(1), Duration::from_millis(2));
        assert_eq!(config.backoff(5), Duration::from_millis(4));
        assert_eq!(config.backoff(64), Duration::from_millis(4));
    }

    #[test]
    fn jitter_only_shortens() {
        let config = RetryConfig::default();
        for _ in 0..50 {
            let wait = config.backoff(0);
            assert!(wait <= Duration::from_millis(400));
            assert!(wait >= Duration::from_millis(320));
        }
    }

    #[test]
    fn retry_after_bounds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("2"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(2)));
        headers.insert("retry-after", HeaderValue::from_static("90"));
        assert_eq!(retry_after(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn transient_statuses() {
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(!is_transient(StatusCode::BAD_REQUEST));
        assert!(!is_transient(StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn gives_up_after_configured_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let outcome = send_with_retry(|| http.post(server.uri()), &quick(2)).await;
        assert!(matches!(
            outcome,
            RetryOutcome::HttpError(r) if r.status() == StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn client_errors_are_final() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let outcome = send_with_retry(|| http.post(server.uri()), &quick(2)).await;
        assert!(matches!(outcome, RetryOutcome::HttpError(_)));
    }
}
