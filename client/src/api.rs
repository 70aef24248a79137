use std::time::Duration;

use focuslab_types::motivation::EMPTY_MESSAGE_FALLBACK;
use focuslab_types::{
    Credentials, Habit, LoginForm, MotivationRequest, MotivationResponse, Task, TaskId, TaskPatch,
    TokenResponse,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ClientError;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Thin wrapper over the FocusLab REST API.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        let raw = base_url.as_ref();
        let base_url = Url::parse(raw).map_err(|e| ClientError::BaseUrl(format!("{raw}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BaseUrl(format!("{raw}: not an HTTP base URL")));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(ClientError::Client)?;
        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `segments` are appended to the base path, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.http.request(method, self.endpoint(segments));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Create an account. Returns the server's confirmation message.
    pub async fn signup(&self, credentials: &Credentials) -> Result<String, ClientError> {
        let response = self
            .request(Method::POST, &["signup"])
            .json(credentials)
            .send()
            .await?;
        if !response.status().is_success() {
            let detail = read_detail(response)
                .await
                .filter(|detail| !detail.is_empty())
                .unwrap_or_else(|| "Signup failed".to_string());
            return Err(ClientError::SignupFailed(detail));
        }
        let body: Value = decode(response).await?;
        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Signup successful")
            .to_string())
    }

    /// Exchange credentials for an access token (form-encoded, OAuth2 style).
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, ClientError> {
        let response = self
            .request(Method::POST, &["login"])
            .form(&LoginForm::from(credentials.clone()))
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Login rejected");
            return Err(ClientError::LoginFailed);
        }
        decode(response).await
    }

    pub async fn get_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let response = self.request(Method::GET, &["tasks"]).send().await?;
        decode(check(response).await?).await
    }

    pub async fn get_habits(&self) -> Result<Vec<Habit>, ClientError> {
        let response = self.request(Method::GET, &["habits"]).send().await?;
        decode(check(response).await?).await
    }

    pub async fn create_task(&self, task: &Task) -> Result<(), ClientError> {
        let response = self.request(Method::POST, &["tasks"]).json(task).send().await?;
        check(response).await.map(drop)
    }

    pub async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), ClientError> {
        let response = self
            .request(Method::PUT, &["tasks", id.as_str()])
            .json(patch)
            .send()
            .await?;
        check(response).await.map(drop)
    }

    pub async fn delete_task(&self, id: &TaskId) -> Result<(), ClientError> {
        let response = self
            .request(Method::DELETE, &["tasks", id.as_str()])
            .send()
            .await?;
        check(response).await.map(drop)
    }

    pub async fn create_habit(&self, habit: &Habit) -> Result<(), ClientError> {
        let response = self.request(Method::POST, &["habits"]).json(habit).send().await?;
        check(response).await.map(drop)
    }

    pub async fn update_habit(&self, habit: &Habit) -> Result<(), ClientError> {
        let response = self
            .request(Method::PUT, &["habits", habit.id.as_str()])
            .json(habit)
            .send()
            .await?;
        check(response).await.map(drop)
    }

    /// Never fails; any error yields a generic line.
    pub async fn get_motivation(&self, request: &MotivationRequest) -> String {
        match self.try_get_motivation(request).await {
            Ok(message) if !message.trim().is_empty() => message,
            Ok(_) => EMPTY_MESSAGE_FALLBACK.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Motivation request failed");
                EMPTY_MESSAGE_FALLBACK.to_string()
            }
        }
    }

    async fn try_get_motivation(&self, request: &MotivationRequest) -> Result<String, ClientError> {
        let response = self
            .request(Method::POST, &["ai", "motivation"])
            .json(request)
            .send()
            .await?;
        let body: MotivationResponse = decode(check(response).await?).await?;
        Ok(body.message)
    }
}

/// Map 401 to [`ClientError::Unauthorized`] and other failures to
/// [`ClientError::Status`].
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }
    let detail = read_detail(response).await.unwrap_or_default();
    Err(ClientError::Status { status, detail })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    response
        .json()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

/// The `detail` of an error body, or the raw body when it is not
/// FastAPI-shaped.
async fn read_detail(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => Some(detail.clone()),
            Some(other) => Some(other.to_string()),
            None => Some(text),
        },
        _ => Some(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_encoded_as_single_segments() {
        let api = ApiClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            api.endpoint(&["tasks", "a#b/c?d"]).as_str(),
            "http://localhost:8000/tasks/a%23b%2Fc%3Fd"
        );
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let api = ApiClient::new("http://example.com/api/").unwrap();
        assert_eq!(
            api.endpoint(&["ai", "motivation"]).as_str(),
            "http://example.com/api/ai/motivation"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::BaseUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("mailto:me@example.com"),
            Err(ClientError::BaseUrl(_))
        ));
    }
}
