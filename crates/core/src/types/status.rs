//! Status enums for products and orders.
//!
//! All of these are stored as Postgres enums in the `shop` schema and travel
//! as `snake_case` strings over the wire.

use serde::{Deserialize, Serialize};

/// Stock availability label derived from a product's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.stock_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    MediumStock,
    InStock,
}

impl StockStatus {
    /// Upper bound (inclusive) of the `low_stock` band.
    pub const LOW_STOCK_MAX: i32 = 4;
    /// Upper bound (inclusive) of the `medium_stock` band.
    pub const MEDIUM_STOCK_MAX: i32 = 10;

    /// Derive the label for a quantity.
    ///
    /// Quantities below zero never reach storage; they are labelled
    /// `out_of_stock` here so the function stays total.
    #[must_use]
    pub const fn from_quantity(quantity: i32) -> Self {
        if quantity <= 0 {
            Self::OutOfStock
        } else if quantity <= Self::LOW_STOCK_MAX {
            Self::LowStock
        } else if quantity <= Self::MEDIUM_STOCK_MAX {
            Self::MediumStock
        } else {
            Self::InStock
        }
    }

    /// Database/wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfStock => "out_of_stock",
            Self::LowStock => "low_stock",
            Self::MediumStock => "medium_stock",
            Self::InStock => "in_stock",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    /// VNPay hosted payment page.
    Vnpay,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cod => write!(f, "cod"),
            Self::Vnpay => write!(f, "vnpay"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "vnpay" => Ok(Self::Vnpay),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Completed,
    Cancelled,
    /// Gateway reported a successful payment.
    Paid,
    /// Gateway reported a failed payment.
    PaymentFailed,
}

impl OrderStatus {
    /// Statuses with no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the order has moved past the payment stage, where gateway
    /// notifications no longer change its state.
    #[must_use]
    pub const fn is_past_payment(&self) -> bool {
        matches!(
            self,
            Self::Processing | Self::Shipped | Self::Completed | Self::Cancelled
        )
    }

    /// Database/wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Paid => "paid",
            Self::PaymentFailed => "payment_failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "paid" => Ok(Self::Paid),
            "payment_failed" => Ok(Self::PaymentFailed),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment status, tracked independently of the order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    AwaitingPayment,
    Paid,
    Completed,
    Failed,
}

impl PaymentStatus {
    /// Money has been received (or confirmed collected).
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Paid | Self::Completed)
    }

    /// Database/wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Paid => "paid",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "awaiting_payment" => Ok(Self::AwaitingPayment),
            "paid" => Ok(Self::Paid),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status_bands() {
        for quantity in 0..=10_000 {
            let expected = match quantity {
                0 => StockStatus::OutOfStock,
                1..=4 => StockStatus::LowStock,
                5..=10 => StockStatus::MediumStock,
                _ => StockStatus::InStock,
            };
            assert_eq!(StockStatus::from_quantity(quantity), expected, "quantity {quantity}");
        }
    }

    #[test]
    fn test_order_status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Paid,
            OrderStatus::PaymentFailed,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_serde_labels() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::PaymentFailed).unwrap(),
            "\"payment_failed\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::AwaitingPayment).unwrap(),
            "\"awaiting_payment\""
        );
        assert_eq!(serde_json::to_string(&PaymentMethod::Cod).unwrap(), "\"cod\"");
    }

    #[test]
    fn test_invalid_labels_rejected() {
        assert!("delivered".parse::<OrderStatus>().is_err());
        assert!("refunded".parse::<PaymentStatus>().is_err());
        assert!("card".parse::<PaymentMethod>().is_err());
    }
}
