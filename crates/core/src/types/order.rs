//! Order documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId, ShippingInfo, UserId};

/// One line of an order. Immutable once the order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Lookup-only reference into the catalog.
    pub product_id: ProductId,
    pub title: String,
    pub quantity: i32,
    /// Unit price at the moment the order was created.
    pub price: Price,
}

impl OrderItem {
    /// `price * quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Gateway metadata attached once a payment notification has been processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub transaction_no: Option<String>,
    pub bank_code: Option<String>,
    pub response_code: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl PaymentDetails {
    /// Overlay every field that `other` sets.
    pub fn merge(&mut self, other: Self) {
        if other.transaction_no.is_some() {
            self.transaction_no = other.transaction_no;
        }
        if other.bank_code.is_some() {
            self.bank_code = other.bank_code;
        }
        if other.response_code.is_some() {
            self.response_code = other.response_code;
        }
        if other.paid_at.is_some() {
            self.paid_at = other.paid_at;
        }
        if other.failed_at.is_some() {
            self.failed_at = other.failed_at;
        }
        if other.failure_reason.is_some() {
            self.failure_reason = other.failure_reason;
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    /// Sum of item subtotals. Shipping is not included.
    pub total_price: Price,
    pub shipping_fee: Price,
    pub shipping_info: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetails>,
    /// Set while the order's items are subtracted from inventory.
    pub stock_committed: bool,
    /// Lines the last commit actually took from inventory. A reversal puts
    /// back exactly these.
    #[serde(default)]
    pub committed_items: Vec<OrderItem>,
    /// Bumped on every write; writes are conditional on the version read.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }
}

/// A validated order ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_price: Price,
    pub shipping_fee: Price,
    pub shipping_info: ShippingInfo,
    pub payment_method: PaymentMethod,
}

/// The lifecycle fields written by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetails>,
    pub stock_committed: bool,
    pub committed_items: Vec<OrderItem>,
}

impl OrderUpdate {
    /// Current lifecycle fields of `order`, as a starting point for edits.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            status: order.status,
            payment_status: order.payment_status,
            payment_details: order.payment_details.clone(),
            stock_committed: order.stock_committed,
            committed_items: order.committed_items.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut details = PaymentDetails {
            transaction_no: Some("14000001".to_owned()),
            bank_code: Some("NCB".to_owned()),
            ..PaymentDetails::default()
        };

        details.merge(PaymentDetails {
            response_code: Some("24".to_owned()),
            failure_reason: Some("cancelled".to_owned()),
            ..PaymentDetails::default()
        });

        assert_eq!(details.transaction_no.as_deref(), Some("14000001"));
        assert_eq!(details.bank_code.as_deref(), Some("NCB"));
        assert_eq!(details.response_code.as_deref(), Some("24"));
        assert_eq!(details.failure_reason.as_deref(), Some("cancelled"));
    }

    #[test]
    fn test_subtotal() {
        let item = OrderItem {
            product_id: ProductId::new(1),
            title: "Ao dai".to_owned(),
            quantity: 3,
            price: Price::from_dong(250_000),
        };
        assert_eq!(item.subtotal(), Price::from_dong(750_000));
    }
}
