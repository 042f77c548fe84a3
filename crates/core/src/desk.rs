//! Back-office order edits.
//!
//! Staff move orders through fulfilment and correct payment statuses here.
//! Edits go through the same guarded transition as checkout and the gateway,
//! so cancelling a paid order puts its stock back exactly once.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::error::Result;
use crate::ledger::{Actor, OrderLedger, StockAction, TransitionOutcome, TransitionRequest};
use crate::notify::{OrderEvent, OrderNotifier, spawn_notification};
use crate::stock::ProductStock;
use crate::store::{OrderStore, ProductStore};
use crate::types::{Order, OrderId, OrderStatus, PaymentStatus};

/// Admin status and payment-status edits over a store.
#[derive(Debug)]
pub struct OrderDesk<'a, S, N> {
    store: &'a S,
    notifier: &'a Arc<N>,
}

impl<'a, S, N> OrderDesk<'a, S, N>
where
    S: ProductStore + OrderStore,
    N: OrderNotifier,
{
    #[must_use]
    pub const fn new(store: &'a S, notifier: &'a Arc<N>) -> Self {
        Self { store, notifier }
    }

    /// Change the order status on behalf of staff.
    ///
    /// Cancelling notifies the customer.
    ///
    /// # Errors
    ///
    /// `NotFound`, `IllegalTransition`, or a store failure.
    #[instrument(skip(self))]
    pub async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let outcome = OrderLedger::new(self.store)
            .transition(order_id, &TransitionRequest::status(status), Actor::Admin)
            .await?;
        let changed = outcome.changed;
        let order = settle_stock(self.store, outcome).await;

        if changed && order.status == OrderStatus::Cancelled {
            spawn_notification(self.notifier, OrderEvent::Cancelled, order.clone());
        }
        Ok(order)
    }

    /// Change the payment status on behalf of staff.
    ///
    /// # Errors
    ///
    /// `NotFound`, `IllegalTransition`, or a store failure.
    #[instrument(skip(self))]
    pub async fn set_payment_status(
        &self,
        order_id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<Order> {
        let outcome = OrderLedger::new(self.store)
            .transition(
                order_id,
                &TransitionRequest::payment_status(payment_status),
                Actor::Admin,
            )
            .await?;
        Ok(settle_stock(self.store, outcome).await)
    }
}

/// Perform the inventory work a persisted transition calls for. Failures
/// are logged; the transition stands.
pub(crate) async fn settle_stock<S>(store: &S, outcome: TransitionOutcome) -> Order
where
    S: ProductStore + OrderStore,
{
    let order = outcome.order;
    let stock = ProductStock::new(store);
    let report = match outcome.stock {
        StockAction::None => return order,
        StockAction::Commit => stock.decrement_for_order(&order.items).await,
        StockAction::Reverse => stock.increment_for_order(&outcome.restock).await,
    };

    if report.is_complete() {
        info!(order_id = %order.id, action = ?outcome.stock, lines = report.applied.len(), "Stock settled");
        return order;
    }

    error!(
        order_id = %order.id,
        action = ?outcome.stock,
        failed = ?report.failed,
        "Inventory adjustment failed, stock needs manual correction"
    );
    if outcome.stock != StockAction::Commit {
        return order;
    }

    match OrderLedger::new(store)
        .record_committed_items(order.id, report.applied_lines)
        .await
    {
        Ok(Some(recorded)) => recorded,
        Ok(None) => {
            error!(
                order_id = %order.id,
                failed = ?report.failed,
                "Order released before its partial commit was recorded, failed lines were over-restored"
            );
            order
        }
        Err(err) => {
            error!(order_id = %order.id, error = %err, "Failed to record committed lines");
            order
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::CommerceError;
    use crate::notify::TracingNotifier;
    use crate::store::MemoryStore;
    use crate::types::{
        NewProduct, OrderItem, PaymentMethod, Price, ProductId, ShippingInfo, UserId,
    };

    async fn placed_order(store: &MemoryStore, stock: i32, quantity: i32) -> (Order, ProductId) {
        let product = store
            .insert_product(NewProduct::new("Ao dai lua", Price::from_dong(450_000), stock))
            .await
            .unwrap();
        let order = OrderLedger::new(store)
            .create(
                UserId::new(9),
                vec![OrderItem {
                    product_id: product.id,
                    title: product.title.clone(),
                    quantity,
                    price: product.price,
                }],
                ShippingInfo {
                    name: "Le Van C".to_owned(),
                    phone: "0933000222".to_owned(),
                    email: "c@example.vn".to_owned(),
                    address: "7 Tran Phu, Da Nang".to_owned(),
                },
                PaymentMethod::Cod,
                Price::from_dong(30_000),
            )
            .await
            .unwrap();
        (order, product.id)
    }

    async fn stock_of(store: &MemoryStore, id: ProductId) -> i32 {
        store.get_product(id).await.unwrap().unwrap().stock_quantity
    }

    #[tokio::test]
    async fn test_processing_commits_and_cancel_restores() {
        let store = MemoryStore::new();
        let notifier = Arc::new(TracingNotifier);
        let desk = OrderDesk::new(&store, &notifier);
        let (order, product) = placed_order(&store, 10, 4).await;

        desk.set_order_status(order.id, OrderStatus::Confirmed).await.unwrap();
        let processing = desk
            .set_order_status(order.id, OrderStatus::Processing)
            .await
            .unwrap();
        assert!(processing.stock_committed);
        assert_eq!(stock_of(&store, product).await, 6);

        let cancelled = desk
            .set_order_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert!(!cancelled.stock_committed);
        assert_eq!(stock_of(&store, product).await, 10);
    }

    #[tokio::test]
    async fn test_completed_cannot_be_cancelled() {
        let store = MemoryStore::new();
        let notifier = Arc::new(TracingNotifier);
        let desk = OrderDesk::new(&store, &notifier);
        let (order, product) = placed_order(&store, 10, 1).await;

        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Completed,
        ] {
            desk.set_order_status(order.id, status).await.unwrap();
        }

        let err = desk
            .set_order_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::IllegalTransition { .. }));
        assert_eq!(stock_of(&store, product).await, 9);
    }

    #[tokio::test]
    async fn test_oversold_commit_keeps_transition() {
        let store = MemoryStore::new();
        let notifier = Arc::new(TracingNotifier);
        let desk = OrderDesk::new(&store, &notifier);
        let (order, product) = placed_order(&store, 2, 2).await;
        store.set_stock(product, 1).await.unwrap();

        desk.set_order_status(order.id, OrderStatus::Confirmed).await.unwrap();
        let processing = desk
            .set_order_status(order.id, OrderStatus::Processing)
            .await
            .unwrap();

        assert_eq!(processing.status, OrderStatus::Processing);
        assert!(processing.committed_items.is_empty());
        assert_eq!(stock_of(&store, product).await, 1);
    }

    #[tokio::test]
    async fn test_cancel_after_short_commit_restores_only_taken_lines() {
        let store = MemoryStore::new();
        let notifier = Arc::new(TracingNotifier);
        let desk = OrderDesk::new(&store, &notifier);
        let (order, product) = placed_order(&store, 2, 2).await;
        store.set_stock(product, 1).await.unwrap();

        desk.set_order_status(order.id, OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(stock_of(&store, product).await, 1);

        let cancelled = desk
            .set_order_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert!(!cancelled.stock_committed);
        assert_eq!(stock_of(&store, product).await, 1);
    }
}
