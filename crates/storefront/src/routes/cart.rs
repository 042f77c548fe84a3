//! Cart route handlers.
//!
//! The cart is stored in the session and returned as JSON after every change.
//! Stock is checked against the catalog on add and update.

use axum::{Json, extract::State};
use lotus_core::{Cart, CartContext, CartLine, OrderId, Price, ProductId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::models::session_keys;
use crate::state::AppState;

/// Cart line as returned to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub title: String,
    pub quantity: i32,
    pub price: Price,
    pub subtotal: Price,
    pub image_url: Option<String>,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            title: line.title.clone(),
            quantity: line.quantity,
            price: line.price,
            subtotal: line.subtotal(),
            image_url: line.image_url.clone(),
        }
    }
}

/// Cart as returned to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: i64,
    pub subtotal: Price,
    /// Unpaid VNPay order created from this cart, if any.
    pub pending_order: Option<OrderId>,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.lines().iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            subtotal: cart.subtotal(),
            pending_order: cart.pending_order(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the session cart, or an empty one.
pub(crate) async fn load_cart(session: &Session) -> Result<CartContext> {
    let cart = session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default();
    let session_id = session.id().map(|id| id.to_string()).unwrap_or_default();
    Ok(CartContext::new(session_id, cart))
}

/// Write the cart back to the session.
pub(crate) async fn save_cart(session: &Session, context: &CartContext) -> Result<()> {
    session.insert(session_keys::CART, &context.cart).await?;
    Ok(())
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Update quantity request.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Remove line request.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: ProductId,
}

// =============================================================================
// Handlers
// =============================================================================

/// Current cart.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<CartView>> {
    let context = load_cart(&session).await?;
    Ok(Json(CartView::from(&context.cart)))
}

/// Add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let mut context = load_cart(&session).await?;
    context
        .cart
        .add(state.coordinator().store(), body.product_id, body.quantity)
        .await?;
    save_cart(&session, &context).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", &body.product_id.to_string())]),
    );
    Ok(Json(CartView::from(&context.cart)))
}

/// Set a line's quantity.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    let mut context = load_cart(&session).await?;
    context
        .cart
        .update_quantity(state.coordinator().store(), body.product_id, body.quantity)
        .await?;
    save_cart(&session, &context).await?;
    Ok(Json(CartView::from(&context.cart)))
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Json(body): Json<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    let mut context = load_cart(&session).await?;
    context.cart.remove(body.product_id);
    save_cart(&session, &context).await?;
    Ok(Json(CartView::from(&context.cart)))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<CartView>> {
    let mut context = load_cart(&session).await?;
    context.cart.clear();
    save_cart(&session, &context).await?;
    Ok(Json(CartView::from(&context.cart)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use lotus_core::{MemoryStore, NewProduct, ProductStore};
    use tower_sessions::MemoryStore as SessionMemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(SessionMemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_cart_round_trips_through_session() {
        let store = MemoryStore::new();
        let product = store
            .insert_product(NewProduct::new("Tra sen", Price::from_dong(50_000), 10))
            .await
            .unwrap();

        let session = session();
        let mut context = load_cart(&session).await.unwrap();
        assert!(context.cart.is_empty());

        context.cart.add(&store, product.id, 2).await.unwrap();
        save_cart(&session, &context).await.unwrap();

        let reloaded = load_cart(&session).await.unwrap();
        assert_eq!(reloaded.cart, context.cart);

        let view = CartView::from(&reloaded.cart);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.subtotal, Price::from_dong(100_000));
        assert_eq!(view.lines.first().unwrap().subtotal, Price::from_dong(100_000));
    }

    #[test]
    fn test_add_request_defaults_quantity() {
        let body: AddToCartRequest = serde_json::from_str(r#"{"product_id": 4}"#).unwrap();
        assert_eq!(body.product_id, ProductId::new(4));
        assert_eq!(body.quantity, 1);
    }
}
