//! Customer order tracking.

use axum::{
    Json,
    extract::{Path, State},
};
use lotus_core::{Order, OrderId};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// The signed-in customer's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = state.coordinator().ledger().list_for_user(user.id).await?;
    Ok(Json(orders))
}

/// One of the signed-in customer's orders.
///
/// Other customers' orders are reported as not found.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = state.coordinator().ledger().get(order_id).await?;
    if order.user_id != user.id {
        return Err(AppError::NotFound(format!("order {order_id}")));
    }
    Ok(Json(order))
}
