//! Customer notifications for order events.
//!
//! Notifiers run on a spawned task after the order change is persisted. A
//! failed notification is logged and never affects the order.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::types::Order;

/// Events a customer is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    /// A COD order was placed.
    Placed,
    /// Online payment succeeded.
    Paid,
    /// Online payment failed.
    PaymentFailed,
    /// The order was cancelled.
    Cancelled,
}

impl OrderEvent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Paid => "paid",
            Self::PaymentFailed => "payment_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers order notifications (email, chat, ...).
pub trait OrderNotifier: Send + Sync + 'static {
    /// Error returned when delivery fails.
    type Error: std::fmt::Display + Send;

    /// Deliver one notification.
    fn notify(
        &self,
        event: OrderEvent,
        order: &Order,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Notifier that only logs. Used when no mail transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl OrderNotifier for TracingNotifier {
    type Error = std::convert::Infallible;

    async fn notify(&self, event: OrderEvent, order: &Order) -> Result<(), Self::Error> {
        info!(
            order_id = %order.id,
            event = %event,
            email = %order.shipping_info.email,
            "Order notification"
        );
        Ok(())
    }
}

/// Run `notifier` on a background task. Requires a Tokio runtime.
pub fn spawn_notification<N: OrderNotifier>(notifier: &Arc<N>, event: OrderEvent, order: Order) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(event, &order).await {
            warn!(order_id = %order.id, event = %event, error = %e, "Order notification failed");
        }
    });
}
