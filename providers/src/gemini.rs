use serde::Deserialize;
use serde_json::{Value, json};

use focuslab_types::MotivationRequest;

use crate::{
    GEMINI_API_BASE_URL, ProviderError, http_client, read_capped_error_body,
    retry::{RetryConfig, RetryOutcome, send_with_retry},
};

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client()?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE_URL.to_string(),
            retry: RetryConfig::default(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model for a motivation message.
    pub async fn motivate(&self, request: &MotivationRequest) -> Result<String, ProviderError> {
        self.generate(&request.prompt()).await
    }

    /// Send a single-turn prompt and return the trimmed text answer.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = build_request_body(prompt);

        let outcome = send_with_retry(
            || {
                self.http
                    .post(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(&body)
            },
            &self.retry,
        )
        .await;

        let response = match outcome {
            RetryOutcome::Success(response) => response,
            RetryOutcome::HttpError(response) => {
                let status = response.status();
                let body = read_capped_error_body(response).await;
                return Err(ProviderError::Api { status, body });
            }
            RetryOutcome::ConnectionError { attempts, source } => {
                return Err(ProviderError::Transport { attempts, source });
            }
        };

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let text = parsed.text();
        if text.trim().is_empty() {
            tracing::warn!(model = %self.model, "Gemini returned no text");
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Build the request body for a one-turn prompt.
///
/// Gemini mixes casing: `contents` is lowercase, `generationConfig` is camelCase.
fn build_request_body(prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }]
        }],
        "generationConfig": {
            "temperature": 1.0
        }
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    text: Option<String>,
    /// Thought summaries are not part of the answer.
    #[serde(default)]
    thought: bool,
}

impl GenerateResponse {
    /// Concatenated answer text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}
