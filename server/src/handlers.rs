use axum::Json;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use focuslab_providers::ProviderError;
use focuslab_store::{HABIT_LIST_LIMIT, TASK_LIST_LIMIT};
use focuslab_types::motivation::{
    EMPTY_MESSAGE_FALLBACK, NO_KEY_MESSAGE, PROVIDER_FAILURE_MESSAGE,
};
use focuslab_types::{
    Credentials, Habit, HabitId, LoginForm, MotivationRequest, MotivationResponse, Task, TaskId,
    TaskPatch, TokenResponse,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::auth::{AuthUser, hash_password, verify_password};
use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// POST /signup
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(credentials) = payload?;
    let email = credentials.email.trim().to_lowercase();
    if email.is_empty() || credentials.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let password = credentials.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|_| ApiError::internal())?
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            ApiError::internal()
        })?;

    let created = {
        let email = email.clone();
        state
            .with_store(move |store| store.create_user(&email, &password_hash))
            .await
    };
    match created {
        Ok(_) => {
            tracing::info!(email = %email, "User registered");
            Ok((
                StatusCode::CREATED,
                Json(json!({ "message": "User created successfully" })),
            ))
        }
        Err(e) if e.status == StatusCode::CONFLICT => {
            Err(ApiError::bad_request("Email already registered"))
        }
        Err(e) => Err(e),
    }
}

/// POST /login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Form(form) = form?;
    let incorrect = || ApiError::new(StatusCode::UNAUTHORIZED, "Incorrect email or password");

    let email = form.username.clone();
    let user = state
        .with_store(move |store| store.find_user(&email))
        .await?
        .ok_or_else(incorrect)?;

    let password = form.password;
    let stored_hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|_| ApiError::internal())?;
    if !valid {
        tracing::info!(email = %user.email, "Rejected login");
        return Err(incorrect());
    }

    let token = state.keys.issue(&user.email).map_err(|e| {
        tracing::error!(error = %e, "Token signing failed");
        ApiError::internal()
    })?;
    Ok(Json(TokenResponse::bearer(token)))
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// GET /tasks
#[instrument(skip_all, fields(user = %user.email))]
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state
        .with_store(move |store| store.list_tasks(&user.email, TASK_LIST_LIMIT))
        .await?;
    Ok(Json(tasks))
}

/// POST /tasks
#[instrument(skip_all, fields(user = %user.email))]
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<Task>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(task) = payload?;
    let stored = task.clone();
    state
        .with_store(move |store| store.insert_task(&user.email, &stored))
        .await?;
    Ok(Json(task))
}

/// PUT /tasks/{id}
#[instrument(skip_all, fields(user = %user.email))]
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(patch) = payload?;
    let task_id = TaskId::new(id);
    let found = state
        .with_store(move |store| store.update_task(&user.email, &task_id, &patch))
        .await?;
    if !found {
        tracing::debug!("Update matched no task");
    }
    Ok(Json(json!({ "status": "updated" })))
}

/// DELETE /tasks/{id}
#[instrument(skip_all, fields(user = %user.email))]
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task_id = TaskId::new(id);
    let found = state
        .with_store(move |store| store.delete_task(&user.email, &task_id))
        .await?;
    if !found {
        tracing::debug!("Delete matched no task");
    }
    Ok(Json(json!({ "status": "deleted" })))
}

// ---------------------------------------------------------------------------
// Habits
// ---------------------------------------------------------------------------

/// GET /habits
#[instrument(skip_all, fields(user = %user.email))]
pub async fn list_habits(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Habit>>, ApiError> {
    let habits = state
        .with_store(move |store| store.list_or_seed_habits(&user.email, HABIT_LIST_LIMIT))
        .await?;
    Ok(Json(habits))
}

/// Trims the name. Placeholder ids are client-side padding and never stored.
fn checked_habit(mut habit: Habit) -> Result<Habit, ApiError> {
    if habit.id.as_str().trim().is_empty() {
        return Err(ApiError::unprocessable("Habit id must not be empty"));
    }
    if habit.id.is_placeholder() {
        return Err(ApiError::unprocessable("Rename this habit before saving it"));
    }
    let name = habit.name.trim();
    if name.is_empty() {
        return Err(ApiError::unprocessable("Habit name must not be empty"));
    }
    if name.len() != habit.name.len() {
        habit.name = name.to_owned();
    }
    Ok(habit)
}

/// POST /habits
#[instrument(skip_all, fields(user = %user.email))]
pub async fn create_habit(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<Habit>, JsonRejection>,
) -> Result<Json<Habit>, ApiError> {
    let Json(habit) = payload?;
    let habit = checked_habit(habit)?;
    let stored = habit.clone();
    state
        .with_store(move |store| store.insert_habit(&user.email, &stored))
        .await?;
    Ok(Json(habit))
}

/// PUT /habits/{id}
#[instrument(skip_all, fields(user = %user.email))]
pub async fn replace_habit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<Habit>, JsonRejection>,
) -> Result<Json<Habit>, ApiError> {
    let Json(mut habit) = payload?;
    habit.id = HabitId::new(id);
    let habit = checked_habit(habit)?;
    let stored = habit.clone();
    state
        .with_store(move |store| store.replace_habit(&user.email, &stored.id, &stored))
        .await?;
    Ok(Json(habit))
}

// ---------------------------------------------------------------------------
// Motivation
// ---------------------------------------------------------------------------

/// POST /ai/motivation
///
/// Always answers 200; provider trouble degrades to a canned message.
#[instrument(skip_all, fields(user = %user.email))]
pub async fn motivation(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<MotivationRequest>, JsonRejection>,
) -> Result<Json<MotivationResponse>, ApiError> {
    let Json(request) = payload?;
    let message = match &state.motivator {
        None => NO_KEY_MESSAGE.to_string(),
        Some(client) => match client.motivate(&request).await {
            Ok(text) => text,
            Err(ProviderError::EmptyResponse) => EMPTY_MESSAGE_FALLBACK.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, kind = %request.kind, "Motivation request failed");
                PROVIDER_FAILURE_MESSAGE.to_string()
            }
        },
    };
    Ok(Json(MotivationResponse { message }))
}
