//! Application state shared across handlers.

use std::sync::Arc;

use lotus_core::{Coordinator, PgStore, VnpayGateway};
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::StorefrontNotifier;

/// The reconciliation engine as wired into the storefront.
pub type StorefrontCoordinator = Coordinator<PgStore, StorefrontNotifier>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    coordinator: StorefrontCoordinator,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool, notifier: StorefrontNotifier) -> Self {
        let coordinator = Coordinator::new(
            PgStore::new(pool.clone()),
            VnpayGateway::new(config.vnpay.clone()),
            notifier,
            config.shipping_fee,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                coordinator,
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

    /// Cart checkout, gateway callbacks and order reads.
    #[must_use]
    pub fn coordinator(&self) -> &StorefrontCoordinator {
        &self.inner.coordinator
    }
}
