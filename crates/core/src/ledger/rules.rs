//! Transition tables and the stock commit/reverse decision.
//!
//! Everything here is pure: given the persisted order and a request, decide
//! the fields to write and what (if anything) must happen to inventory.

use crate::error::{CommerceError, Result};
use crate::types::{Order, OrderStatus, OrderUpdate, PaymentDetails, PaymentStatus};

/// Who is asking for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The checkout flow acting for the customer.
    Checkout,
    /// A back-office user.
    Admin,
    /// A verified payment gateway notification.
    Gateway,
}

/// Requested lifecycle change. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub details: Option<PaymentDetails>,
}

impl TransitionRequest {
    #[must_use]
    pub const fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            payment_status: None,
            details: None,
        }
    }

    #[must_use]
    pub const fn payment_status(payment_status: PaymentStatus) -> Self {
        Self {
            status: None,
            payment_status: Some(payment_status),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: PaymentDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// What must happen to inventory after a transition is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAction {
    None,
    /// Subtract every item.
    Commit,
    /// Add back the lines the last commit took.
    Reverse,
}

/// The decided write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub update: OrderUpdate,
    pub stock: StockAction,
}

impl Plan {
    /// Whether the write would change anything.
    #[must_use]
    pub fn changes(&self, order: &Order) -> bool {
        self.update != OrderUpdate::from_order(order)
    }
}

/// Whether `actor` may move an order from `from` to `to`.
///
/// Same-status requests are not transitions and are handled by the caller.
#[must_use]
pub fn status_transition_allowed(from: OrderStatus, to: OrderStatus, actor: Actor) -> bool {
    use OrderStatus::{
        Cancelled, Completed, Confirmed, Paid, PaymentFailed, Pending, Processing, Shipped,
    };

    match (from, to) {
        (Pending | Confirmed | PaymentFailed, Paid) | (Pending | Confirmed | Paid, PaymentFailed) => {
            actor == Actor::Gateway
        }
        (Pending, Confirmed | Processing | Cancelled)
        | (Confirmed | Paid, Processing | Cancelled)
        | (Processing, Shipped | Cancelled)
        | (Shipped, Completed)
        | (PaymentFailed, Cancelled) => true,
        _ => false,
    }
}

/// Whether `actor` may move a payment from `from` to `to`.
#[must_use]
pub fn payment_transition_allowed(from: PaymentStatus, to: PaymentStatus, actor: Actor) -> bool {
    use PaymentStatus::{AwaitingPayment, Completed, Failed, Paid, Pending};

    match (from, to) {
        (Pending, AwaitingPayment)
        | (Pending | AwaitingPayment, Paid | Completed | Failed)
        | (Paid, Completed) => true,
        (Paid | Completed, Failed) | (Failed, Paid) => actor == Actor::Gateway,
        _ => false,
    }
}

/// Decide the write for `request` against the persisted `order`.
///
/// # Errors
///
/// `IllegalTransition` if either table rejects the move.
pub fn plan(order: &Order, request: &TransitionRequest, actor: Actor) -> Result<Plan> {
    let status = request.status.unwrap_or(order.status);
    if status != order.status && !status_transition_allowed(order.status, status, actor) {
        return Err(CommerceError::IllegalTransition {
            from: order.status.to_string(),
            to: status.to_string(),
        });
    }

    let payment_status = request.payment_status.unwrap_or(order.payment_status);
    if payment_status != order.payment_status
        && !payment_transition_allowed(order.payment_status, payment_status, actor)
    {
        return Err(CommerceError::IllegalTransition {
            from: format!("payment {}", order.payment_status),
            to: format!("payment {payment_status}"),
        });
    }

    let payment_details = match (&order.payment_details, &request.details) {
        (current, None) => current.clone(),
        (None, Some(incoming)) => Some(incoming.clone()),
        (Some(current), Some(incoming)) => {
            let mut merged = current.clone();
            merged.merge(incoming.clone());
            Some(merged)
        }
    };

    let enters_status = |target: OrderStatus| status == target && order.status != target;
    let enters_payment = |targets: &[PaymentStatus]| {
        targets.contains(&payment_status) && !targets.contains(&order.payment_status)
    };

    let stock = if order.stock_committed {
        if enters_status(OrderStatus::Cancelled) || enters_payment(&[PaymentStatus::Failed]) {
            StockAction::Reverse
        } else {
            StockAction::None
        }
    } else if enters_status(OrderStatus::Processing)
        || enters_payment(&[PaymentStatus::Paid, PaymentStatus::Completed])
    {
        StockAction::Commit
    } else {
        StockAction::None
    };

    // A commit claims every line until the decrement reports what it took.
    let (stock_committed, committed_items) = match stock {
        StockAction::Commit => (true, order.items.clone()),
        StockAction::Reverse => (false, Vec::new()),
        StockAction::None => (order.stock_committed, order.committed_items.clone()),
    };

    Ok(Plan {
        update: OrderUpdate {
            status,
            payment_status,
            payment_details,
            stock_committed,
            committed_items,
        },
        stock,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{
        OrderId, OrderItem, PaymentMethod, Price, ProductId, ShippingInfo, UserId,
    };
    use chrono::Utc;

    const ALL_STATUSES: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Paid,
        OrderStatus::PaymentFailed,
    ];

    fn order(status: OrderStatus, payment_status: PaymentStatus, committed: bool) -> Order {
        let mut order = Order {
            id: OrderId::new(1),
            user_id: UserId::new(1),
            items: vec![OrderItem {
                product_id: ProductId::new(1),
                title: "Gom Bat Trang".to_owned(),
                quantity: 2,
                price: Price::from_dong(150_000),
            }],
            total_price: Price::from_dong(300_000),
            shipping_fee: Price::from_dong(30_000),
            shipping_info: ShippingInfo {
                name: "Le Van C".to_owned(),
                phone: "0987654321".to_owned(),
                email: "c@example.vn".to_owned(),
                address: "5 Tran Phu, Da Nang".to_owned(),
            },
            payment_method: PaymentMethod::Vnpay,
            status,
            payment_status,
            payment_details: None,
            stock_committed: committed,
            committed_items: Vec::new(),
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        if committed {
            order.committed_items = order.items.clone();
        }
        order
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for to in ALL_STATUSES {
            for actor in [Actor::Admin, Actor::Gateway, Actor::Checkout] {
                assert!(!status_transition_allowed(OrderStatus::Completed, to, actor));
                assert!(!status_transition_allowed(OrderStatus::Cancelled, to, actor));
            }
        }
    }

    #[test]
    fn test_gateway_only_statuses() {
        assert!(!status_transition_allowed(OrderStatus::Pending, OrderStatus::Paid, Actor::Admin));
        assert!(status_transition_allowed(OrderStatus::Pending, OrderStatus::Paid, Actor::Gateway));
        assert!(status_transition_allowed(
            OrderStatus::PaymentFailed,
            OrderStatus::Paid,
            Actor::Gateway
        ));
        assert!(!status_transition_allowed(
            OrderStatus::Processing,
            OrderStatus::Paid,
            Actor::Gateway
        ));
        assert!(!status_transition_allowed(
            OrderStatus::Confirmed,
            OrderStatus::PaymentFailed,
            Actor::Admin
        ));
    }

    #[test]
    fn test_admin_table() {
        use OrderStatus::{Cancelled, Completed, Confirmed, Paid, PaymentFailed, Pending, Processing, Shipped};
        let allowed = [
            (Pending, Confirmed),
            (Pending, Processing),
            (Pending, Cancelled),
            (Confirmed, Processing),
            (Confirmed, Cancelled),
            (Paid, Processing),
            (Paid, Cancelled),
            (Processing, Shipped),
            (Processing, Cancelled),
            (Shipped, Completed),
            (PaymentFailed, Cancelled),
        ];
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                if from == to {
                    continue;
                }
                assert_eq!(
                    status_transition_allowed(from, to, Actor::Admin),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_payment_table() {
        use PaymentStatus::{AwaitingPayment, Completed, Failed, Paid, Pending};
        assert!(payment_transition_allowed(Pending, AwaitingPayment, Actor::Checkout));
        assert!(payment_transition_allowed(AwaitingPayment, Paid, Actor::Gateway));
        assert!(payment_transition_allowed(Paid, Completed, Actor::Admin));
        assert!(!payment_transition_allowed(Paid, Failed, Actor::Admin));
        assert!(payment_transition_allowed(Paid, Failed, Actor::Gateway));
        assert!(!payment_transition_allowed(Failed, Paid, Actor::Admin));
        assert!(payment_transition_allowed(Failed, Paid, Actor::Gateway));
        assert!(!payment_transition_allowed(Completed, Pending, Actor::Gateway));
    }

    #[test]
    fn test_completed_to_cancelled_rejected() {
        let completed = order(OrderStatus::Completed, PaymentStatus::Completed, true);
        for actor in [Actor::Admin, Actor::Gateway] {
            let err = plan(&completed, &TransitionRequest::status(OrderStatus::Cancelled), actor)
                .unwrap_err();
            assert!(matches!(err, CommerceError::IllegalTransition { .. }));
        }
    }

    #[test]
    fn test_commit_on_processing_once() {
        let pending = order(OrderStatus::Pending, PaymentStatus::Pending, false);
        let plan_a = plan(
            &pending,
            &TransitionRequest::status(OrderStatus::Processing),
            Actor::Admin,
        )
        .unwrap();
        assert_eq!(plan_a.stock, StockAction::Commit);
        assert!(plan_a.update.stock_committed);
        assert_eq!(plan_a.update.committed_items, pending.items);

        let paid = order(OrderStatus::Paid, PaymentStatus::Paid, true);
        let plan_b = plan(
            &paid,
            &TransitionRequest::status(OrderStatus::Processing),
            Actor::Admin,
        )
        .unwrap();
        assert_eq!(plan_b.stock, StockAction::None);
    }

    #[test]
    fn test_commit_on_payment_paid() {
        let awaiting = order(OrderStatus::Pending, PaymentStatus::AwaitingPayment, false);
        let request = TransitionRequest {
            status: Some(OrderStatus::Paid),
            payment_status: Some(PaymentStatus::Paid),
            details: None,
        };
        let decided = plan(&awaiting, &request, Actor::Gateway).unwrap();
        assert_eq!(decided.stock, StockAction::Commit);

        // Paid to completed is not a second commit.
        let paid = order(OrderStatus::Paid, PaymentStatus::Paid, true);
        let decided = plan(
            &paid,
            &TransitionRequest::payment_status(PaymentStatus::Completed),
            Actor::Admin,
        )
        .unwrap();
        assert_eq!(decided.stock, StockAction::None);
    }

    #[test]
    fn test_reverse_on_cancel_only_when_committed() {
        let processing = order(OrderStatus::Processing, PaymentStatus::Pending, true);
        let decided = plan(
            &processing,
            &TransitionRequest::status(OrderStatus::Cancelled),
            Actor::Admin,
        )
        .unwrap();
        assert_eq!(decided.stock, StockAction::Reverse);
        assert!(!decided.update.stock_committed);
        assert!(decided.update.committed_items.is_empty());

        let confirmed = order(OrderStatus::Confirmed, PaymentStatus::Pending, false);
        let decided = plan(
            &confirmed,
            &TransitionRequest::status(OrderStatus::Cancelled),
            Actor::Admin,
        )
        .unwrap();
        assert_eq!(decided.stock, StockAction::None);
    }

    #[test]
    fn test_same_status_is_noop() {
        let shipped = order(OrderStatus::Shipped, PaymentStatus::Paid, true);
        let decided = plan(
            &shipped,
            &TransitionRequest::status(OrderStatus::Shipped),
            Actor::Admin,
        )
        .unwrap();
        assert_eq!(decided.stock, StockAction::None);
        assert!(!decided.changes(&shipped));
    }

    #[test]
    fn test_details_merged() {
        let mut paid = order(OrderStatus::Paid, PaymentStatus::Paid, true);
        paid.payment_details = Some(PaymentDetails {
            transaction_no: Some("1".to_owned()),
            ..PaymentDetails::default()
        });
        let request = TransitionRequest::default().with_details(PaymentDetails {
            bank_code: Some("NCB".to_owned()),
            ..PaymentDetails::default()
        });
        let decided = plan(&paid, &request, Actor::Gateway).unwrap();
        let details = decided.update.payment_details.unwrap();
        assert_eq!(details.transaction_no.as_deref(), Some("1"));
        assert_eq!(details.bank_code.as_deref(), Some("NCB"));
    }
}
