//! Integration tests for Lotus Market.
//!
//! The suites in `tests/` drive the reconciliation engine end to end against
//! the in-memory store: checkout, VNPay callbacks arriving in any order, and
//! back-office edits. Gateway callbacks are signed here independently of the
//! engine's own signing code, so a drift in the wire format fails the suites.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lotus-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use lotus_core::{
    Cart, CartContext, Coordinator, NewProduct, Order, OrderId, PaymentMethod, Price, ProductId,
    ProductStore, ShippingInfo, StockStatus, TracingNotifier, UserId, VnpayConfig, VnpayGateway,
};
use secrecy::SecretString;
use sha2::Sha512;
use url::form_urlencoded;

/// Merchant secret shared by the test shop and the simulated gateway.
pub const HASH_SECRET: &str = "Vq7XbN2mLs9KdR4tWz8PcY1hJf6GeA3u";
/// Merchant terminal code.
pub const TMN_CODE: &str = "LOTUSQA1";
/// Flat shipping fee.
pub const SHIPPING_FEE: i64 = 30_000;
/// Unit price of every test product.
pub const UNIT_PRICE: i64 = 100_000;
/// VNPay "customer cancelled" response code.
pub const CUSTOMER_CANCELLED: &str = "24";

/// Engine wired to the in-memory store.
pub type Shop = Coordinator<lotus_core::MemoryStore, TracingNotifier>;

/// A fresh shop with an empty catalog.
#[must_use]
pub fn shop() -> Shop {
    Coordinator::new(
        lotus_core::MemoryStore::new(),
        VnpayGateway::new(VnpayConfig {
            tmn_code: TMN_CODE.to_owned(),
            hash_secret: SecretString::from(HASH_SECRET),
            pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_owned(),
            return_url: "https://qa.lotus.vn/payment/vnpay/return".to_owned(),
        }),
        TracingNotifier,
        Price::from_dong(SHIPPING_FEE),
    )
}

/// Shipping details for the test customer.
#[must_use]
pub fn shipping() -> ShippingInfo {
    ShippingInfo {
        name: "Hoang Van F".to_owned(),
        phone: "0908123456".to_owned(),
        email: "f@example.vn".to_owned(),
        address: "88 Dong Khoi, Quan 1, TP HCM".to_owned(),
    }
}

/// The customer placing every test order.
#[must_use]
pub const fn customer() -> UserId {
    UserId::new(501)
}

/// Add a product with `stock` units.
///
/// # Panics
///
/// If the store rejects the insert.
pub async fn product(shop: &Shop, title: &str, stock: i32) -> ProductId {
    shop.store()
        .insert_product(NewProduct::new(title, Price::from_dong(UNIT_PRICE), stock))
        .await
        .expect("insert product")
        .id
}

/// Current quantity and label of a product.
///
/// # Panics
///
/// If the product does not exist.
pub async fn stock_of(shop: &Shop, id: ProductId) -> (i32, StockStatus) {
    let product = shop
        .store()
        .get_product(id)
        .await
        .expect("read product")
        .expect("product exists");
    (product.stock_quantity, product.stock_status)
}

/// A session cart holding the given lines.
///
/// # Panics
///
/// If a line cannot be added.
pub async fn cart_with(shop: &Shop, lines: &[(ProductId, i32)]) -> CartContext {
    let mut context = CartContext::new("qa-session", Cart::new());
    for &(product_id, quantity) in lines {
        context
            .cart
            .add(shop.store(), product_id, quantity)
            .await
            .expect("add to cart");
    }
    context
}

/// Check out the given lines. Returns the order and the cart afterwards.
///
/// # Panics
///
/// If checkout fails.
pub async fn checkout(
    shop: &Shop,
    lines: &[(ProductId, i32)],
    payment_method: PaymentMethod,
) -> (Order, CartContext) {
    let mut cart = cart_with(shop, lines).await;
    let outcome = shop
        .checkout(&mut cart, customer(), shipping(), payment_method, "203.0.113.7")
        .await
        .expect("checkout");
    (outcome.order, cart)
}

/// Re-read an order.
///
/// # Panics
///
/// If the order does not exist.
pub async fn reload(shop: &Shop, id: OrderId) -> Order {
    shop.ledger().get(id).await.expect("order exists")
}

/// Callback parameters as VNPay sends them for `order`, signed.
///
/// # Panics
///
/// If the order total cannot be expressed in minor units.
#[must_use]
pub fn gateway_callback(order: &Order, response_code: &str) -> BTreeMap<String, String> {
    let amount = order
        .total_price
        .to_minor_units()
        .expect("amount in minor units");

    let params: BTreeMap<String, String> = [
        ("vnp_Amount", amount.to_string()),
        ("vnp_BankCode", "NCB".to_owned()),
        ("vnp_CardType", "ATM".to_owned()),
        ("vnp_OrderInfo", format!("Thanh toan don hang {}", order.id)),
        ("vnp_PayDate", "20261016153045".to_owned()),
        ("vnp_ResponseCode", response_code.to_owned()),
        ("vnp_TmnCode", TMN_CODE.to_owned()),
        ("vnp_TransactionNo", "14226112".to_owned()),
        ("vnp_TransactionStatus", response_code.to_owned()),
        ("vnp_TxnRef", order.id.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value))
    .collect();

    sign(params)
}

/// Replace `vnp_SecureHash` with a fresh signature over the other parameters.
///
/// # Panics
///
/// Never in practice; HMAC accepts keys of any length.
#[must_use]
pub fn sign(mut params: BTreeMap<String, String>) -> BTreeMap<String, String> {
    params.remove("vnp_SecureHash");
    params.remove("vnp_SecureHashType");

    let data = params
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    let mut mac =
        Hmac::<Sha512>::new_from_slice(HASH_SECRET.as_bytes()).expect("hmac accepts any key");
    mac.update(data.as_bytes());
    params.insert(
        "vnp_SecureHash".to_owned(),
        hex::encode(mac.finalize().into_bytes()),
    );
    params
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
