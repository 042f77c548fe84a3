//! Manual stock correction after a physical recount.
//!
//! # Usage
//!
//! ```bash
//! lotus stock set 12 40
//! ```

use lotus_core::{CommerceError, PgStore, ProductId, ProductStore};
use tracing::info;

use super::{CommandError, connect};

/// Overwrite a product's stock quantity. The stock status is recomputed by
/// the store.
///
/// # Errors
///
/// Returns an error for a negative quantity, an unknown product, or a
/// database failure.
pub async fn set(product_id: ProductId, quantity: i32) -> Result<(), CommandError> {
    validate_quantity(quantity)?;

    let store = PgStore::new(connect().await?);
    let product = store
        .set_stock(product_id, quantity)
        .await?
        .ok_or_else(|| CommerceError::NotFound {
            entity: "product",
            id: product_id.to_string(),
        })?;

    info!(
        product_id = %product.id,
        title = %product.title,
        stock = product.stock_quantity,
        status = ?product.stock_status,
        "Stock updated"
    );
    Ok(())
}

fn validate_quantity(quantity: i32) -> Result<(), CommandError> {
    if quantity < 0 {
        return Err(CommandError::InvalidArgument(format!(
            "stock quantity must not be negative, got {quantity}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_quantity_rejected() {
        assert!(matches!(
            validate_quantity(-1),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(validate_quantity(0).is_ok());
    }
}
