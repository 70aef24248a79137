use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the REST router.
///
/// Browsers at `cors_origin` may call every route with credentials, so
/// methods and headers are mirrored rather than wildcarded.
pub fn api_router(state: AppState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/tasks/{id}",
            put(handlers::update_task).delete(handlers::delete_task),
        )
        .route(
            "/habits",
            get(handlers::list_habits).post(handlers::create_habit),
        )
        .route("/habits/{id}", put(handlers::replace_habit))
        .route("/ai/motivation", post(handlers::motivation))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
