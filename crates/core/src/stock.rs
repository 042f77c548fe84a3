//! Product stock counters.
//!
//! Every quantity change goes through [`ProductStore::adjust_stock`], which
//! applies the delta and recomputes the stock status in one atomic write.

use tracing::{instrument, warn};

use crate::error::{CommerceError, Result};
use crate::store::{ProductStore, StockWrite};
use crate::types::{OrderItem, ProductId};

/// Outcome of adjusting stock for every line of an order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdjustmentReport {
    /// `(product, quantity after the write)` for each line that was applied.
    pub applied: Vec<(ProductId, i32)>,
    /// The order lines that were applied, as given.
    pub applied_lines: Vec<OrderItem>,
    /// `(product, reason)` for each line that failed.
    pub failed: Vec<(ProductId, String)>,
}

impl AdjustmentReport {
    /// Whether every line was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Atomic increment/decrement primitives over a [`ProductStore`].
#[derive(Debug)]
pub struct ProductStock<'a, S> {
    store: &'a S,
}

impl<'a, S: ProductStore> ProductStock<'a, S> {
    /// Borrow a product store.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Subtract `quantity` units. Returns the new quantity.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a non-positive quantity, `NotFound` for an unknown
    /// product, `InventoryAdjustmentFailed` if the counter would go negative.
    #[instrument(skip(self))]
    pub async fn decrement(&self, product_id: ProductId, quantity: i32) -> Result<i32> {
        let delta = positive(quantity)?
            .checked_neg()
            .ok_or_else(|| CommerceError::InvalidArgument(format!("quantity {quantity}")))?;
        self.apply(product_id, delta).await
    }

    /// Add `quantity` units back. Returns the new quantity.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a non-positive quantity, `NotFound` for an unknown
    /// product.
    #[instrument(skip(self))]
    pub async fn increment(&self, product_id: ProductId, quantity: i32) -> Result<i32> {
        self.apply(product_id, positive(quantity)?).await
    }

    /// Decrement every line of an order. Failing lines are logged and
    /// skipped; nothing already applied is rolled back.
    pub async fn decrement_for_order(&self, items: &[OrderItem]) -> AdjustmentReport {
        let mut report = AdjustmentReport::default();
        for item in items {
            let result = self.decrement(item.product_id, item.quantity).await;
            record(&mut report, item, result, "decrement");
        }
        report
    }

    /// Increment every line of an order. Same failure policy as
    /// [`ProductStock::decrement_for_order`].
    pub async fn increment_for_order(&self, items: &[OrderItem]) -> AdjustmentReport {
        let mut report = AdjustmentReport::default();
        for item in items {
            let result = self.increment(item.product_id, item.quantity).await;
            record(&mut report, item, result, "increment");
        }
        report
    }

    async fn apply(&self, product_id: ProductId, delta: i32) -> Result<i32> {
        match self.store.adjust_stock(product_id, delta).await? {
            StockWrite::Applied(product) => Ok(product.stock_quantity),
            StockWrite::NotFound => Err(CommerceError::product_not_found(product_id)),
            StockWrite::Insufficient { available } => {
                Err(CommerceError::InventoryAdjustmentFailed {
                    product_id,
                    reason: format!("{available} in stock, cannot remove {}", -i64::from(delta)),
                })
            }
        }
    }
}

fn positive(quantity: i32) -> Result<i32> {
    if quantity <= 0 {
        return Err(CommerceError::InvalidArgument(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(quantity)
}

fn record(report: &mut AdjustmentReport, item: &OrderItem, result: Result<i32>, op: &str) {
    match result {
        Ok(quantity) => {
            report.applied.push((item.product_id, quantity));
            report.applied_lines.push(item.clone());
        }
        Err(err) => {
            let err = match err {
                err @ CommerceError::InventoryAdjustmentFailed { .. } => err,
                other => CommerceError::InventoryAdjustmentFailed {
                    product_id: item.product_id,
                    reason: other.to_string(),
                },
            };
            warn!(
                product_id = %item.product_id,
                quantity = item.quantity,
                operation = op,
                error = %err,
                "Stock adjustment failed"
            );
            report.failed.push((item.product_id, err.to_string()));
        }
    }
}
