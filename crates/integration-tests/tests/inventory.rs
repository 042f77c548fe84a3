//! Stock counter properties.

#![allow(clippy::unwrap_used)]

use lotus_core::{MemoryStore, NewProduct, Price, ProductStock, ProductStore, StockStatus};

fn expected_status(quantity: i32) -> StockStatus {
    match quantity {
        0 => StockStatus::OutOfStock,
        1..=4 => StockStatus::LowStock,
        5..=10 => StockStatus::MediumStock,
        _ => StockStatus::InStock,
    }
}

#[tokio::test]
async fn test_status_matches_quantity_band_everywhere() {
    let store = MemoryStore::new();
    let product = store
        .insert_product(NewProduct::new("Nuoc mam Phu Quoc", Price::from_dong(140_000), 0))
        .await
        .unwrap();
    assert_eq!(product.stock_status, StockStatus::OutOfStock);

    for quantity in 0..=1_000 {
        let updated = store.set_stock(product.id, quantity).await.unwrap().unwrap();
        assert_eq!(
            updated.stock_status,
            expected_status(quantity),
            "quantity {quantity}"
        );
    }
}

#[tokio::test]
async fn test_decrement_then_increment_round_trips() {
    let store = MemoryStore::new();
    let stock = ProductStock::new(&store);

    for start in [1, 4, 5, 10, 11, 250] {
        let product = store
            .insert_product(NewProduct::new("Banh pia", Price::from_dong(60_000), start))
            .await
            .unwrap();

        for quantity in 1..=start {
            stock.decrement(product.id, quantity).await.unwrap();
            stock.increment(product.id, quantity).await.unwrap();

            let after = store.get_product(product.id).await.unwrap().unwrap();
            assert_eq!(after.stock_quantity, start);
            assert_eq!(after.stock_status, product.stock_status);
        }
    }
}

#[tokio::test]
async fn test_concurrent_decrements_all_land() {
    let store = MemoryStore::new();
    let product = store
        .insert_product(NewProduct::new("Ca phe", Price::from_dong(185_000), 100))
        .await
        .unwrap();

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { ProductStock::new(&store).decrement(product.id, 3).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let after = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(after.stock_quantity, 40);
    assert_eq!(after.stock_status, StockStatus::InStock);
}

#[tokio::test]
async fn test_racing_decrements_never_oversell() {
    let store = MemoryStore::new();
    let product = store
        .insert_product(NewProduct::new("Gom Bat Trang", Price::from_dong(560_000), 5))
        .await
        .unwrap();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { ProductStock::new(&store).decrement(product.id, 2).await })
        })
        .collect();

    let mut applied = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            applied += 1;
        }
    }

    let after = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(applied, 2);
    assert_eq!(after.stock_quantity, 1);
    assert_eq!(after.stock_status, StockStatus::LowStock);
}
