//! Checkout route handler.
//!
//! Turns the session cart into an order. COD orders come back confirmed;
//! VNPay orders come back with the hosted payment page URL to redirect to.

use axum::{Json, extract::State};
use lotus_core::{
    CheckoutOutcome, OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price, ShippingInfo,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{ClientIp, RequireAuth};
use crate::routes::cart::{load_cart, save_cart};
use crate::state::AppState;

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_info: ShippingInfo,
    pub payment_method: PaymentMethod,
}

/// Checkout response body.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_price: Price,
    pub shipping_fee: Price,
    /// Where to send the browser next (VNPay only).
    pub redirect_url: Option<String>,
}

impl From<CheckoutOutcome> for CheckoutResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        Self {
            order_id: outcome.order.id,
            status: outcome.order.status,
            payment_status: outcome.order.payment_status,
            total_price: outcome.order.total_price,
            shipping_fee: outcome.order.shipping_fee,
            redirect_url: outcome.redirect_url,
        }
    }
}

/// Place an order from the session cart.
#[instrument(skip(state, session, user, body), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    ClientIp(client_ip): ClientIp,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let mut context = load_cart(&session).await?;

    let outcome = state
        .coordinator()
        .checkout(
            &mut context,
            user.id,
            body.shipping_info,
            body.payment_method,
            &client_ip,
        )
        .await?;

    // COD clears the cart, VNPay tags it with the pending order
    save_cart(&session, &context).await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[
            ("order_id", &outcome.order_id().to_string()),
            ("payment_method", &body.payment_method.to_string()),
        ]),
    );
    Ok(Json(CheckoutResponse::from(outcome)))
}
