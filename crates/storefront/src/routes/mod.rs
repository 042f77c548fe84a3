//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness (database)
//!
//! # Cart (JSON, session-scoped)
//! GET  /cart                   - Current cart
//! POST /cart/add               - Add a product
//! POST /cart/update            - Set a line's quantity
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Empty the cart
//!
//! # Checkout (requires auth)
//! POST /checkout               - Place an order from the cart
//!
//! # VNPay
//! GET  /payment/vnpay/return   - Browser return, renders the result page
//! GET  /payment/vnpay/ipn      - Server-to-server notification
//!
//! # Orders (requires auth)
//! GET  /orders                 - Own orders, newest first
//! GET  /orders/{id}            - One own order
//! ```

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod payment;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the VNPay callback routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/vnpay/return", get(payment::vnpay_return))
        .route("/vnpay/ipn", get(payment::vnpay_ipn))
}

/// Create the order tracking routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::checkout))
        .nest("/payment", payment_routes())
        .nest("/orders", order_routes())
}
