//! Application state shared across handlers.

use std::sync::Arc;

use lotus_core::{OrderDesk, OrderLedger, PgStore};
use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::AdminNotifier;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    store: PgStore,
    notifier: Arc<AdminNotifier>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool, notifier: AdminNotifier) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store: PgStore::new(pool.clone()),
                pool,
                notifier: Arc::new(notifier),
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Order reads.
    #[must_use]
    pub fn ledger(&self) -> OrderLedger<'_, PgStore> {
        OrderLedger::new(&self.inner.store)
    }

    /// Status and payment-status edits.
    #[must_use]
    pub fn desk(&self) -> OrderDesk<'_, PgStore, AdminNotifier> {
        OrderDesk::new(&self.inner.store, &self.inner.notifier)
    }
}
