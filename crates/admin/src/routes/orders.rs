//! Order management route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use lotus_core::{Order, OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{error::Result, state::AppState};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationQuery {
    /// Limit and offset with defaults applied. The limit is capped, out of
    /// range values are left for the ledger to reject.
    fn page(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        (limit, self.offset.unwrap_or(0))
    }
}

/// One row of the order listing.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub item_count: i64,
    pub total_price: Price,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            customer_name: order.shipping_info.name.clone(),
            customer_email: order.shipping_info.email.clone(),
            item_count: order.items.iter().map(|item| i64::from(item.quantity)).sum(),
            total_price: order.total_price,
            payment_method: order.payment_method,
            status: order.status,
            payment_status: order.payment_status,
            created_at: order.created_at,
        }
    }
}

/// Order listing page.
#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub orders: Vec<OrderSummary>,
    pub limit: i64,
    pub offset: i64,
}

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: OrderStatus,
}

/// Payment status change body.
#[derive(Debug, Deserialize)]
pub struct PaymentStatusInput {
    pub payment_status: PaymentStatus,
}

/// Order listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<OrderPage>> {
    let (limit, offset) = query.page();
    let orders = state.ledger().list(limit, offset).await?;

    Ok(Json(OrderPage {
        orders: orders.iter().map(OrderSummary::from).collect(),
        limit,
        offset,
    }))
}

/// Order detail.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<OrderId>) -> Result<Json<Order>> {
    Ok(Json(state.ledger().get(id).await?))
}

/// Move an order to a new fulfilment status.
#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(input): Json<StatusInput>,
) -> Result<Json<Order>> {
    let order = state.desk().set_order_status(id, input.status).await?;
    tracing::info!(order_id = %order.id, status = %order.status, "Order status updated by staff");
    Ok(Json(order))
}

/// Correct an order's payment status.
#[instrument(skip(state))]
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(input): Json<PaymentStatusInput>,
) -> Result<Json<Order>> {
    let order = state
        .desk()
        .set_payment_status(id, input.payment_status)
        .await?;
    tracing::info!(
        order_id = %order.id,
        payment_status = %order.payment_status,
        "Payment status updated by staff"
    );
    Ok(Json(order))
}
