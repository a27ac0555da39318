//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::lifecycle::ViewLifecycles;
use crate::search::SearchDebouncer;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    debouncer: SearchDebouncer,
    lifecycles: ViewLifecycles,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let debouncer = SearchDebouncer::new(config.search_debounce);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                debouncer,
                lifecycles: ViewLifecycles::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the QKart backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the search debouncer.
    #[must_use]
    pub fn debouncer(&self) -> &SearchDebouncer {
        &self.inner.debouncer
    }

    /// Get a reference to the login scope registry.
    #[must_use]
    pub fn lifecycles(&self) -> &ViewLifecycles {
        &self.inner.lifecycles
    }
}
