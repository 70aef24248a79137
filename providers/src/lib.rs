//! Language model access for motivation messages.
//!
//! Only Google Gemini is supported. Requests are single-shot
//! `generateContent` calls sent through [`retry::send_with_retry`].

pub mod gemini;
pub mod retry;

use std::time::Duration;

use thiserror::Error;

pub use gemini::GeminiClient;

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("model returned no text")]
    EmptyResponse,
}

pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .build()
        .map_err(ProviderError::Client)
}

/// Read an error body, truncated to a fixed size.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
