use std::sync::Arc;

use focuslab_providers::GeminiClient;
use focuslab_store::{Store, StoreError};

use crate::auth::TokenKeys;
use crate::error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<Store>,
    pub keys: Arc<TokenKeys>,
    /// `None` when no Gemini API key is configured.
    pub motivator: Option<GeminiClient>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Store, keys: TokenKeys, motivator: Option<GeminiClient>) -> Self {
        Self {
            store: Arc::new(store),
            keys: Arc::new(keys),
            motivator,
        }
    }

    /// Run a store call on the blocking pool.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Store task panicked");
                ApiError::internal()
            })?
            .map_err(ApiError::from)
    }
}
