//! Order documents and their lifecycle.
//!
//! Transitions are decided by [`rules::plan`] against the persisted order
//! and written with a version-conditional update. A writer that loses the
//! race re-reads the order and decides again, so two callers can never both
//! see the same "before" state and both commit stock.

pub mod rules;

use tracing::{debug, instrument, warn};

use crate::error::{CommerceError, Result};
use crate::store::{OrderStore, StoreError};
use crate::types::{
    NewOrder, Order, OrderId, OrderItem, OrderStatus, OrderUpdate, PaymentDetails, PaymentMethod,
    PaymentStatus, Price, ShippingInfo, UserId,
};

pub use rules::{Actor, StockAction, TransitionRequest};

/// Attempts at a conditional write before giving up with a conflict.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Result of a [`OrderLedger::transition`] call.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The order as persisted after the call.
    pub order: Order,
    /// Status before the transition.
    pub previous_status: OrderStatus,
    /// Payment status before the transition.
    pub previous_payment_status: PaymentStatus,
    /// Inventory work the caller must now perform.
    pub stock: StockAction,
    /// Lines to put back when `stock` is [`StockAction::Reverse`].
    pub restock: Vec<OrderItem>,
    /// `false` when the request matched the persisted state and nothing was written.
    pub changed: bool,
}

/// Order creation, reads and guarded transitions.
#[derive(Debug)]
pub struct OrderLedger<'a, S> {
    store: &'a S,
}

impl<'a, S: OrderStore> OrderLedger<'a, S> {
    /// Borrow an order store.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Validate and persist a new order with `pending` statuses.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for empty items, non-positive quantities, negative
    /// prices or fees, or blank shipping fields.
    #[instrument(skip(self, items, shipping_info), fields(item_count = items.len()))]
    pub async fn create(
        &self,
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_info: ShippingInfo,
        payment_method: PaymentMethod,
        shipping_fee: Price,
    ) -> Result<Order> {
        if items.is_empty() {
            return Err(CommerceError::InvalidArgument(
                "order must contain at least one item".to_owned(),
            ));
        }
        for item in &items {
            if item.quantity <= 0 {
                return Err(CommerceError::InvalidArgument(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
            if item.price.is_negative() {
                return Err(CommerceError::InvalidArgument(format!(
                    "price for product {} is negative",
                    item.product_id
                )));
            }
        }
        if shipping_fee.is_negative() {
            return Err(CommerceError::InvalidArgument(
                "shipping fee is negative".to_owned(),
            ));
        }
        let shipping_info = shipping_info
            .normalized()
            .map_err(|e| CommerceError::InvalidArgument(e.to_string()))?;

        let total_price = items.iter().map(OrderItem::subtotal).sum();
        let order = self
            .store
            .insert_order(NewOrder {
                user_id,
                items,
                total_price,
                shipping_fee,
                shipping_info,
                payment_method,
            })
            .await?;

        debug!(order_id = %order.id, total = %order.total_price, "Order created");
        Ok(order)
    }

    /// Fetch an order.
    ///
    /// # Errors
    ///
    /// `NotFound` if it does not exist.
    pub async fn get(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| CommerceError::order_not_found(order_id))
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a non-positive limit or negative offset.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Order>> {
        if limit <= 0 || offset < 0 {
            return Err(CommerceError::InvalidArgument(format!(
                "invalid page limit={limit} offset={offset}"
            )));
        }
        Ok(self.store.list_orders(limit, offset).await?)
    }

    /// Apply a status and/or payment-status change.
    ///
    /// A request that matches the persisted state is a successful no-op.
    ///
    /// # Errors
    ///
    /// `NotFound`, `IllegalTransition`, or `Store(Conflict)` when concurrent
    /// writers keep winning.
    #[instrument(skip(self, request), fields(status = ?request.status, payment_status = ?request.payment_status))]
    pub async fn transition(
        &self,
        order_id: OrderId,
        request: &TransitionRequest,
        actor: Actor,
    ) -> Result<TransitionOutcome> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.get(order_id).await?;
            let plan = rules::plan(&current, request, actor)?;

            if !plan.changes(&current) {
                return Ok(TransitionOutcome {
                    previous_status: current.status,
                    previous_payment_status: current.payment_status,
                    order: current,
                    stock: StockAction::None,
                    restock: Vec::new(),
                    changed: false,
                });
            }

            if let Some(order) = self
                .store
                .update_order(order_id, current.version, plan.update)
                .await?
            {
                debug!(
                    from = %current.status,
                    to = %order.status,
                    payment_from = %current.payment_status,
                    payment_to = %order.payment_status,
                    stock = ?plan.stock,
                    "Order transitioned"
                );
                let restock = if plan.stock == StockAction::Reverse {
                    current.committed_items
                } else {
                    Vec::new()
                };
                return Ok(TransitionOutcome {
                    previous_status: current.status,
                    previous_payment_status: current.payment_status,
                    order,
                    stock: plan.stock,
                    restock,
                    changed: true,
                });
            }

            warn!(attempt, version = current.version, "Order changed concurrently, re-deciding");
        }

        Err(StoreError::Conflict(format!(
            "order {order_id} still contended after {MAX_WRITE_ATTEMPTS} attempts"
        ))
        .into())
    }

    /// Merge gateway metadata into the order without touching its statuses.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `Store(Conflict)` when concurrent writers keep winning.
    #[instrument(skip(self, details))]
    pub async fn record_payment_details(
        &self,
        order_id: OrderId,
        details: PaymentDetails,
    ) -> Result<Order> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self.get(order_id).await?;
            let mut update = OrderUpdate::from_order(&current);
            let mut merged = update.payment_details.take().unwrap_or_default();
            merged.merge(details.clone());
            update.payment_details = Some(merged);

            if let Some(order) = self
                .store
                .update_order(order_id, current.version, update)
                .await?
            {
                return Ok(order);
            }
        }

        Err(StoreError::Conflict(format!(
            "order {order_id} still contended after {MAX_WRITE_ATTEMPTS} attempts"
        ))
        .into())
    }

    /// Narrow the committed lines to those a commit actually took.
    ///
    /// Returns `None` when the order was released before the lines could be
    /// recorded; the release then restored every line.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `Store(Conflict)` when concurrent writers keep winning.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn record_committed_items(
        &self,
        order_id: OrderId,
        items: Vec<OrderItem>,
    ) -> Result<Option<Order>> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self.get(order_id).await?;
            if !current.stock_committed {
                return Ok(None);
            }
            let mut update = OrderUpdate::from_order(&current);
            update.committed_items.clone_from(&items);

            if let Some(order) = self
                .store
                .update_order(order_id, current.version, update)
                .await?
            {
                return Ok(Some(order));
            }
        }

        Err(StoreError::Conflict(format!(
            "order {order_id} still contended after {MAX_WRITE_ATTEMPTS} attempts"
        ))
        .into())
    }
}
