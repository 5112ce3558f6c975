//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::config::StorefrontConfig;
use crate::fallback::{BundledCatalog, FallbackError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Api(#[from] ApiError),
    #[error("fallback catalog: {0}")]
    Fallback(#[from] FallbackError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and is read-only after
/// startup. Everything visitor-specific lives in the session.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    fallback: BundledCatalog,
}

impl AppState {
    /// Create a new application state with the bundled fallback catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built or the bundled
    /// catalog fails to parse.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let fallback = BundledCatalog::load()?;
        Self::with_fallback(config, fallback)
    }

    /// Create a new application state with an explicit fallback catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built.
    pub fn with_fallback(config: StorefrontConfig, fallback: BundledCatalog) -> Result<Self, StateError> {
        let api = ApiClient::new(&config.api)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                fallback,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the bundled catalog.
    #[must_use]
    pub fn fallback(&self) -> &BundledCatalog {
        &self.inner.fallback
    }
}
