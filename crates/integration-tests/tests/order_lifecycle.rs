//! Checkout and back-office edits moving stock.

#![allow(clippy::unwrap_used)]

use lotus_core::{
    CommerceError, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductStock,
    ProductStore, ReturnOutcome, StockStatus,
};
use lotus_integration_tests::{
    SHIPPING_FEE, UNIT_PRICE, checkout, customer, gateway_callback, product, reload, shipping,
    shop, stock_of,
};

#[tokio::test]
async fn test_cod_order_commits_on_processing() {
    let shop = shop();
    let coffee = product(&shop, "Ca phe Buon Ma Thuot", 10).await;
    let item = OrderItem {
        product_id: coffee,
        title: "Ca phe Buon Ma Thuot".to_owned(),
        quantity: 2,
        price: Price::from_dong(UNIT_PRICE),
    };

    let order = shop
        .ledger()
        .create(
            customer(),
            vec![item],
            shipping(),
            PaymentMethod::Cod,
            Price::from_dong(SHIPPING_FEE),
        )
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(stock_of(&shop, coffee).await, (10, StockStatus::MediumStock));

    let processing = shop
        .set_order_status(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    assert!(processing.stock_committed);
    assert_eq!(stock_of(&shop, coffee).await, (8, StockStatus::MediumStock));
}

#[tokio::test]
async fn test_cod_checkout_confirms_and_clears_cart() {
    let shop = shop();
    let coffee = product(&shop, "Ca phe Buon Ma Thuot", 10).await;
    let (order, cart) = checkout(&shop, &[(coffee, 2)], PaymentMethod::Cod).await;

    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.total_price, Price::from_dong(2 * UNIT_PRICE));
    assert_eq!(order.shipping_fee, Price::from_dong(SHIPPING_FEE));
    assert!(cart.cart.is_empty());
    assert_eq!(stock_of(&shop, coffee).await.0, 10);

    let mine = shop.ledger().list_for_user(customer()).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine.first().unwrap().id, order.id);
}

#[tokio::test]
async fn test_checkout_refuses_stock_sold_meanwhile() {
    let shop = shop();
    let hat = product(&shop, "Non la Hue", 3).await;
    let mut cart = lotus_integration_tests::cart_with(&shop, &[(hat, 3)]).await;
    shop.store().set_stock(hat, 1).await.unwrap();

    let err = shop
        .checkout(&mut cart, customer(), shipping(), PaymentMethod::Cod, "203.0.113.7")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CommerceError::OutOfStock {
            requested: 3,
            available: 1,
            ..
        }
    ));
    assert!(!cart.cart.is_empty());
    assert!(shop.ledger().list_for_user(customer()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_processing_cancel_restores_every_item() {
    let shop = shop();
    let coffee = product(&shop, "Ca phe Buon Ma Thuot", 20).await;
    let tea = product(&shop, "Tra sen Tay Ho", 7).await;
    let hat = product(&shop, "Non la Hue", 2).await;
    let (order, _) = checkout(
        &shop,
        &[(coffee, 5), (tea, 3), (hat, 2)],
        PaymentMethod::Cod,
    )
    .await;

    shop.set_order_status(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(stock_of(&shop, coffee).await.0, 15);
    assert_eq!(stock_of(&shop, tea).await.0, 4);
    assert_eq!(stock_of(&shop, hat).await, (0, StockStatus::OutOfStock));

    let cancelled = shop
        .set_order_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert!(!cancelled.stock_committed);
    assert_eq!(stock_of(&shop, coffee).await, (20, StockStatus::InStock));
    assert_eq!(stock_of(&shop, tea).await, (7, StockStatus::MediumStock));
    assert_eq!(stock_of(&shop, hat).await, (2, StockStatus::LowStock));

    // Cancelled is terminal
    assert!(
        shop.set_order_status(order.id, OrderStatus::Processing)
            .await
            .is_err()
    );
    assert_eq!(stock_of(&shop, coffee).await.0, 20);
}

#[tokio::test]
async fn test_completed_order_cannot_be_cancelled_by_anyone() {
    let shop = shop();
    let lamp = product(&shop, "Den long Hoi An", 6).await;
    let (order, mut cart) = checkout(&shop, &[(lamp, 1)], PaymentMethod::Vnpay).await;

    let params = gateway_callback(&order, "00");
    shop.handle_ipn(&params).await;
    for status in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Completed,
    ] {
        shop.set_order_status(order.id, status).await.unwrap();
    }
    assert_eq!(stock_of(&shop, lamp).await.0, 5);

    let err = shop
        .set_order_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::IllegalTransition { .. }));

    // A gateway failure for a finished order is flagged, not applied
    let failure = gateway_callback(&order, "24");
    assert_eq!(
        shop.handle_ipn(&failure).await,
        lotus_core::IpnResponse::SUCCESS
    );
    assert!(matches!(
        shop.handle_return(&mut cart, &failure).await,
        ReturnOutcome::NeedsAttention { .. }
    ));

    let finished = reload(&shop, order.id).await;
    assert_eq!(finished.status, OrderStatus::Completed);
    assert_eq!(finished.payment_status, PaymentStatus::Paid);
    assert_eq!(stock_of(&shop, lamp).await.0, 5);
}

#[tokio::test]
async fn test_paid_order_processing_does_not_commit_twice() {
    let shop = shop();
    let lamp = product(&shop, "Den long Hoi An", 6).await;
    let (order, _) = checkout(&shop, &[(lamp, 2)], PaymentMethod::Vnpay).await;

    shop.handle_ipn(&gateway_callback(&order, "00")).await;
    assert_eq!(stock_of(&shop, lamp).await.0, 4);

    shop.set_order_status(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(stock_of(&shop, lamp).await.0, 4);

    let cancelled = shop
        .set_order_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.payment_status, PaymentStatus::Paid);
    assert_eq!(stock_of(&shop, lamp).await.0, 6);
}

#[tokio::test]
async fn test_staff_cannot_mark_orders_paid() {
    let shop = shop();
    let lamp = product(&shop, "Den long Hoi An", 6).await;
    let (order, _) = checkout(&shop, &[(lamp, 1)], PaymentMethod::Cod).await;

    let err = shop
        .set_order_status(order.id, OrderStatus::Paid)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::IllegalTransition { .. }));

    // Recording COD cash on delivery is a payment-status edit
    let collected = shop
        .set_payment_status(order.id, PaymentStatus::Completed)
        .await
        .unwrap();
    assert_eq!(collected.payment_status, PaymentStatus::Completed);
    assert_eq!(collected.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn test_oversold_commit_is_an_alert_not_a_rollback() {
    let shop = shop();
    let hat = product(&shop, "Non la Hue", 2).await;
    let (first, _) = checkout(&shop, &[(hat, 2)], PaymentMethod::Cod).await;
    let (second, _) = checkout(&shop, &[(hat, 2)], PaymentMethod::Cod).await;

    shop.set_order_status(first.id, OrderStatus::Processing)
        .await
        .unwrap();
    let second = shop
        .set_order_status(second.id, OrderStatus::Processing)
        .await
        .unwrap();

    assert_eq!(second.status, OrderStatus::Processing);
    assert_eq!(stock_of(&shop, hat).await, (0, StockStatus::OutOfStock));
    assert!(
        ProductStock::new(shop.store())
            .decrement(hat, 1)
            .await
            .is_err()
    );

    // Only what a commit actually took goes back
    let second = shop
        .set_order_status(second.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert!(!second.stock_committed);
    assert_eq!(stock_of(&shop, hat).await, (0, StockStatus::OutOfStock));

    shop.set_order_status(first.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(stock_of(&shop, hat).await, (2, StockStatus::LowStock));
}

#[tokio::test]
async fn test_partial_commit_cancel_restores_taken_lines_only() {
    let shop = shop();
    let coffee = product(&shop, "Ca phe Buon Ma Thuot", 10).await;
    let hat = product(&shop, "Non la Hue", 3).await;
    let (order, _) = checkout(&shop, &[(coffee, 4), (hat, 3)], PaymentMethod::Cod).await;
    shop.store().set_stock(hat, 1).await.unwrap();

    let processing = shop
        .set_order_status(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(processing.committed_items.len(), 1);
    assert_eq!(stock_of(&shop, coffee).await.0, 6);
    assert_eq!(stock_of(&shop, hat).await.0, 1);

    shop.set_order_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(stock_of(&shop, coffee).await, (10, StockStatus::MediumStock));
    assert_eq!(stock_of(&shop, hat).await, (1, StockStatus::LowStock));
}
