//! Engine error taxonomy.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::{Price, ProductId};

/// Errors surfaced by the cart, stock, ledger and reconciliation components.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Bad quantity, missing field, or otherwise malformed input.
    /// Raised before anything is mutated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Order or product does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity ("order", "product", "cart line").
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Requested cart quantity exceeds what is in stock.
    #[error("product {product_id} has {available} in stock, {requested} requested")]
    OutOfStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },

    /// The transition tables do not allow this edit.
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    /// Gateway callback signature missing or wrong.
    #[error("gateway signature is invalid")]
    SignatureInvalid,

    /// Gateway amount differs from the order total.
    #[error("amount mismatch: order total {expected}, gateway reported {received}")]
    AmountMismatch { expected: Price, received: Price },

    /// A stock adjustment for one item failed.
    #[error("inventory adjustment failed for product {product_id}: {reason}")]
    InventoryAdjustmentFailed { product_id: ProductId, reason: String },

    /// Persistence layer failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CommerceError {
    pub(crate) fn order_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "order",
            id: id.to_string(),
        }
    }

    pub(crate) fn product_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "product",
            id: id.to_string(),
        }
    }

    /// Whether this is a caller mistake rather than a system failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Store(_) | Self::InventoryAdjustmentFailed { .. }
        )
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, CommerceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CommerceError::order_not_found(42);
        assert_eq!(err.to_string(), "order 42 not found");

        let err = CommerceError::OutOfStock {
            product_id: ProductId::new(3),
            requested: 5,
            available: 2,
        };
        assert_eq!(err.to_string(), "product 3 has 2 in stock, 5 requested");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(CommerceError::SignatureInvalid.is_client_error());
        assert!(!CommerceError::Store(StoreError::Conflict("version".to_owned())).is_client_error());
    }
}
