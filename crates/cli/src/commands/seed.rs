//! Seed the catalog with sample products for local development.

use lotus_core::{NewProduct, PgStore, Price, ProductStore};
use tracing::info;

use super::{CommandError, connect};

/// Products inserted by `lotus seed`: title, price in dong, stock.
const SAMPLE_PRODUCTS: &[(&str, i64, i32)] = &[
    ("Ca phe Buon Ma Thuot 500g", 185_000, 40),
    ("Tra sen Tay Ho", 320_000, 12),
    ("Non la Hue", 95_000, 25),
    ("Ao dai lua to tam", 1_450_000, 5),
    ("Banh pia Soc Trang (hop 4 cai)", 60_000, 80),
    ("Nuoc mam Phu Quoc 40 do dam", 140_000, 3),
    ("Gom Bat Trang - bo am chen", 560_000, 0),
];

/// Build the sample catalog.
fn sample_products() -> Vec<NewProduct> {
    SAMPLE_PRODUCTS
        .iter()
        .map(|&(title, price, stock)| NewProduct::new(title, Price::from_dong(price), stock))
        .collect()
}

/// Insert the sample catalog.
///
/// Products are always inserted, so running twice doubles the catalog.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn products() -> Result<(), CommandError> {
    let store = PgStore::new(connect().await?);

    for product in sample_products() {
        let inserted = store.insert_product(product).await?;
        info!(
            product_id = %inserted.id,
            title = %inserted.title,
            stock = inserted.stock_quantity,
            status = ?inserted.stock_status,
            "Seeded product"
        );
    }

    info!(count = SAMPLE_PRODUCTS.len(), "Seeding complete!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_catalog_is_valid() {
        let products = sample_products();
        assert_eq!(products.len(), SAMPLE_PRODUCTS.len());
        assert!(products.iter().all(|p| p.stock_quantity >= 0));
        assert!(products.iter().all(|p| !p.price.is_negative()));
        // Covers every stock status
        assert!(products.iter().any(|p| p.stock_quantity == 0));
        assert!(products.iter().any(|p| (1..=5).contains(&p.stock_quantity)));
        assert!(products.iter().any(|p| p.stock_quantity > 5));
    }
}
