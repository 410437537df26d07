//! Application state shared across handlers.

use std::sync::Arc;

use hmac::digest::InvalidLength;
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::catalog::CatalogCache;
use crate::services::{ConfirmationTokens, NotificationQueue};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    notifications: NotificationQueue,
    tokens: ConfirmationTokens,
    catalog_cache: CatalogCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the confirmation secret cannot key the token MAC.
    pub fn new(
        config: ServerConfig,
        pool: PgPool,
        notifications: NotificationQueue,
    ) -> Result<Self, InvalidLength> {
        let tokens = ConfirmationTokens::new(config.confirmation_key())?;
        let catalog_cache = CatalogCache::new(config.catalog_cache_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                notifications,
                tokens,
                catalog_cache,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Outbound order event queue.
    #[must_use]
    pub fn notifications(&self) -> &NotificationQueue {
        &self.inner.notifications
    }

    /// Order confirmation token issuer.
    #[must_use]
    pub fn tokens(&self) -> &ConfirmationTokens {
        &self.inner.tokens
    }

    #[must_use]
    pub fn catalog_cache(&self) -> &CatalogCache {
        &self.inner.catalog_cache
    }
}
