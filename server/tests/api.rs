use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderValue, Method, Request, StatusCode, header};
use focuslab_providers::GeminiClient;
use focuslab_providers::retry::RetryConfig;
use focuslab_server::{AppState, TokenKeys, api_router};
use focuslab_store::Store;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORIGIN: &str = "http://localhost:5173";

fn app_with(motivator: Option<GeminiClient>) -> Router {
    let state = AppState::new(
        Store::open_in_memory().unwrap(),
        TokenKeys::new("test-secret", 60),
        motivator,
    );
    api_router(state, HeaderValue::from_static(ORIGIN))
}

fn app() -> Router {
    app_with(None)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn signup_and_login(app: &Router, email: &str) -> String {
    let (status, _) = send(
        app,
        json_request(
            Method::POST,
            "/signup",
            None,
            &json!({ "email": email, "password": "pw-123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let form = format!("username={}&password=pw-123", email.replace('@', "%40"));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

fn task_json(id: &str, text: &str, date: &str) -> Value {
    json!({
        "id": id,
        "text": text,
        "isCompleted": false,
        "date": date,
        "createdAt": "2024-03-04T08:00:00.000Z"
    })
}

#[tokio::test]
async fn health_is_open() {
    let (status, body) = send(&app(), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn duplicate_signup_is_rejected() {
    let app = app();
    signup_and_login(&app, "a@example.com").await;
    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/signup",
            None,
            &json!({ "email": "A@example.com", "password": "other" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = app();
    signup_and_login(&app, "a@example.com").await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=a%40example.com&password=nope"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Incorrect email or password");
}

#[tokio::test]
async fn data_routes_require_a_token() {
    let app = app();
    for uri in ["/tasks", "/habits"] {
        let (status, body) = send(&app, get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Unauthorized");

        let (status, _) = send(&app, get(uri, Some("not-a-jwt"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn task_lifecycle() {
    let app = app();
    let token = signup_and_login(&app, "a@example.com").await;
    let task = task_json("t1", "Write report", "2024-03-04");

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/tasks", Some(&token), &task),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "t1");

    let (status, body) = send(
        &app,
        json_request(
            Method::PUT,
            "/tasks/t1",
            Some(&token),
            &json!({ "isCompleted": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "updated" }));

    let (_, body) = send(&app, get("/tasks", Some(&token))).await;
    assert_eq!(body[0]["isCompleted"], true);
    assert_eq!(body[0]["text"], "Write report");

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/tasks/t1")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "deleted" }));

    let (_, body) = send(&app, get("/tasks", Some(&token))).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn tasks_are_private_per_user() {
    let app = app();
    let alice = signup_and_login(&app, "alice@example.com").await;
    let bob = signup_and_login(&app, "bob@example.com").await;

    send(
        &app,
        json_request(
            Method::POST,
            "/tasks",
            Some(&alice),
            &task_json("t1", "Alice only", "2024-03-04"),
        ),
    )
    .await;

    let (_, body) = send(&app, get("/tasks", Some(&bob))).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn blank_task_text_is_rejected() {
    let app = app();
    let token = signup_and_login(&app, "a@example.com").await;
    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/tasks",
            Some(&token),
            &task_json("t1", "   ", "2024-03-04"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn habits_are_seeded_then_replaced() {
    let app = app();
    let token = signup_and_login(&app, "a@example.com").await;

    let (status, body) = send(&app, get("/habits", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Wake up 6am", "No A**", "NO dopamine"]);

    let (status, body) = send(
        &app,
        json_request(
            Method::PUT,
            "/habits/h2",
            Some(&token),
            &json!({ "id": "ignored", "name": "No snooze", "completedDates": ["2024-03-04"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "h2");

    let (_, body) = send(&app, get("/habits", Some(&token))).await;
    assert_eq!(body[1]["name"], "No snooze");
    assert_eq!(body[1]["completedDates"], json!(["2024-03-04"]));
}

#[tokio::test]
async fn blank_habit_names_are_rejected() {
    let app = app();
    let token = signup_and_login(&app, "a@example.com").await;

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/habits",
            Some(&token),
            &json!({ "id": "h9", "name": "   ", "completedDates": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        json_request(
            Method::PUT,
            "/habits/h1",
            Some(&token),
            &json!({ "id": "h1", "name": "", "completedDates": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/habits",
            Some(&token),
            &json!({ "id": "h9", "name": "  Stretch ", "completedDates": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Stretch");
}

#[tokio::test]
async fn placeholder_habits_are_never_stored() {
    let app = app();
    let token = signup_and_login(&app, "a@example.com").await;
    let placeholder = json!({ "id": "temp_0_abc", "name": "Click to Edit", "completedDates": [] });

    let (status, body) = send(
        &app,
        json_request(Method::PUT, "/habits/temp_0_abc", Some(&token), &placeholder),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let (status, _) = send(
        &app,
        json_request(Method::POST, "/habits", Some(&token), &placeholder),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = send(&app, get("/habits", Some(&token))).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["h1", "h2", "h3"]);
}

#[tokio::test]
async fn motivation_without_key_is_canned() {
    let app = app();
    let token = signup_and_login(&app, "a@example.com").await;
    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/ai/motivation",
            Some(&token),
            &json!({ "completed_count": 3, "total_count": 4, "type": "encouragement" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Great job! (Configure API Key for AI)");
}

fn gemini(server: &MockServer) -> GeminiClient {
    GeminiClient::new("key", "gemini-2.5-flash")
        .unwrap()
        .with_base_url(server.uri())
        .with_retry(RetryConfig {
            max_retries: 0,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            jitter_factor: 0.0,
        })
}

#[tokio::test]
async fn motivation_relays_model_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Finish strong." }] } }]
        })))
        .mount(&server)
        .await;

    let app = app_with(Some(gemini(&server)));
    let token = signup_and_login(&app, "a@example.com").await;
    let (_, body) = send(
        &app,
        json_request(
            Method::POST,
            "/ai/motivation",
            Some(&token),
            &json!({ "completed_count": 4, "total_count": 4, "type": "celebration" }),
        ),
    )
    .await;
    assert_eq!(body["message"], "Finish strong.");
}

#[tokio::test]
async fn motivation_falls_back_when_model_text_is_blank() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_with(Some(gemini(&server)));
    let token = signup_and_login(&app, "a@example.com").await;
    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/ai/motivation",
            Some(&token),
            &json!({ "completed_count": 4, "total_count": 4, "type": "celebration" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Keep pushing forward.");
}

#[tokio::test]
async fn motivation_degrades_on_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = app_with(Some(gemini(&server)));
    let token = signup_and_login(&app, "a@example.com").await;
    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/ai/motivation",
            Some(&token),
            &json!({ "completed_count": 3, "total_count": 4, "type": "encouragement" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Stay focused. Keep pushing.");
}

#[tokio::test]
async fn cors_preflight_allows_frontend_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/tasks")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}
