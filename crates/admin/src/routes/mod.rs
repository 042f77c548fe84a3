//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Database readiness check
//!
//! # Orders
//! GET  /orders?limit=&offset=       - Order listing, newest first
//! GET  /orders/{id}                 - Full order document
//! POST /orders/{id}/status          - Change fulfilment status
//! POST /orders/{id}/payment-status  - Correct payment status
//! ```

pub mod orders;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/orders/{id}/payment-status", post(orders::update_payment_status))
}
