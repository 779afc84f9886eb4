//! Application state shared across handlers.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::cart::CartStore;
use crate::services::images::ImageDiscovery;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections, the cart store and
/// configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    carts: CartStore,
    images: ImageDiscovery,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let carts = CartStore::new(config.cart.max_sessions, config.cart.idle_ttl);
        let images = ImageDiscovery::new(config.images_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                carts,
                images,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the session-keyed cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }

    /// Get a reference to the product image scanner.
    #[must_use]
    pub fn images(&self) -> &ImageDiscovery {
        &self.inner.images
    }

    /// Multiplier for the strikethrough display price, if enabled.
    #[must_use]
    pub fn compare_at_multiplier(&self) -> Option<Decimal> {
        self.inner.config.catalog.compare_at_multiplier
    }
}
