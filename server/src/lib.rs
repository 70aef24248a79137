//! FocusLab REST service.
//!
//! Accounts, per-user task and habit storage, and an AI motivation endpoint,
//! served over axum with a SQLite store.

pub mod auth;
pub mod error;
mod handlers;
pub mod router;
pub mod state;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use focuslab_config::{AiSettings, ServerSettings};
use focuslab_providers::GeminiClient;
use focuslab_store::Store;
use tokio::net::TcpListener;

pub use auth::{AuthUser, TokenKeys};
pub use error::ApiError;
pub use router::api_router;
pub use state::AppState;

/// Build the Gemini client, if a key is configured.
pub fn motivator(ai: Option<&AiSettings>) -> Result<Option<GeminiClient>> {
    let Some(ai) = ai else {
        tracing::warn!("No Gemini API key configured; motivation uses a canned message");
        return Ok(None);
    };
    let mut client = GeminiClient::new(&ai.api_key, &ai.model)?;
    if let Some(base_url) = &ai.base_url {
        client = client.with_base_url(base_url);
    }
    Ok(Some(client))
}

/// Open the store, bind, and serve until Ctrl-C / SIGTERM.
pub async fn serve(settings: ServerSettings) -> Result<()> {
    if !settings.jwt_secret_configured {
        tracing::warn!(
            "No JWT secret configured; tokens will not survive a restart"
        );
    }

    let cors_origin = HeaderValue::from_str(&settings.cors_origin)
        .with_context(|| format!("invalid CORS origin '{}'", settings.cors_origin))?;

    let database = settings.database.clone();
    let store = tokio::task::spawn_blocking(move || Store::open(&database))
        .await?
        .with_context(|| format!("failed to open database {}", settings.database.display()))?;

    let state = AppState::new(
        store,
        TokenKeys::new(&settings.jwt_secret, settings.token_ttl_minutes),
        motivator(settings.ai.as_ref())?,
    );
    let router = api_router(state, cors_origin);

    let listener = TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind))?;
    tracing::info!(bind = %settings.bind, "FocusLab API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
