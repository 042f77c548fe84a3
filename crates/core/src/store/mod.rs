//! Persistence seams for products and orders.
//!
//! The engine never talks to a database directly; it goes through
//! [`ProductStore`] and [`OrderStore`]. Two implementations ship with the
//! crate:
//!
//! - [`MemoryStore`] - in-process maps, used by tests and the integration suite
//! - `PgStore` - `PostgreSQL` via sqlx (behind the `postgres` feature)
//!
//! # Atomicity contract
//!
//! Implementations must make [`ProductStore::adjust_stock`] a single atomic
//! conditional write (quantity and status change together, and never below
//! zero), and [`OrderStore::update_order`] a compare-and-swap on the order's
//! `version`. The ledger builds its idempotency on these two guarantees.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

use std::future::Future;

use thiserror::Error;

use crate::types::{NewOrder, NewProduct, Order, OrderId, OrderUpdate, Product, ProductId, UserId};

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A concurrent writer won and retries were exhausted.
    #[error("write conflict: {0}")]
    Conflict(String),
}

/// Result of an atomic stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockWrite {
    /// The adjustment was applied; carries the product after the write.
    Applied(Product),
    /// Applying the delta would take the quantity below zero. Nothing changed.
    Insufficient { available: i32 },
    /// No product with that id.
    NotFound,
}

/// Product lookups and stock counters.
pub trait ProductStore: Send + Sync {
    /// Fetch a product by id.
    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, StoreError>> + Send;

    /// Insert a product, deriving its stock status from the quantity.
    fn insert_product(
        &self,
        product: NewProduct,
    ) -> impl Future<Output = Result<Product, StoreError>> + Send;

    /// Add `delta` (possibly negative) to the stock quantity and recompute
    /// the stock status, atomically, refusing to go below zero.
    fn adjust_stock(
        &self,
        id: ProductId,
        delta: i32,
    ) -> impl Future<Output = Result<StockWrite, StoreError>> + Send;

    /// Overwrite the stock quantity (back-office recount).
    ///
    /// Returns `None` if the product does not exist.
    fn set_stock(
        &self,
        id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<Option<Product>, StoreError>> + Send;
}

/// Order documents.
pub trait OrderStore: Send + Sync {
    /// Persist a new order with `pending` statuses, `version` 1 and no stock
    /// committed.
    fn insert_order(
        &self,
        order: NewOrder,
    ) -> impl Future<Output = Result<Order, StoreError>> + Send;

    /// Fetch an order by id.
    fn get_order(&self, id: OrderId)
    -> impl Future<Output = Result<Option<Order>, StoreError>> + Send;

    /// A customer's orders, newest first.
    fn list_orders_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Order>, StoreError>> + Send;

    /// All orders, newest first.
    fn list_orders(
        &self,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<Order>, StoreError>> + Send;

    /// Write the lifecycle fields if the stored version still equals
    /// `expected_version`, bumping the version.
    ///
    /// Returns `None` when the order is missing or another writer got there
    /// first; the caller re-reads to tell which.
    fn update_order(
        &self,
        id: OrderId,
        expected_version: i32,
        update: OrderUpdate,
    ) -> impl Future<Output = Result<Option<Order>, StoreError>> + Send;
}
