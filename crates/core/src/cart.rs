//! Session-scoped shopping cart.
//!
//! The cart itself is plain data, serialized into the session by the web
//! layer. Mutations that depend on stock take the [`ProductStore`] explicitly.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{CommerceError, Result};
use crate::store::ProductStore;
use crate::types::{OrderId, OrderItem, Price, Product, ProductId};

/// One product in the cart with its catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub title: String,
    pub price: Price,
    pub image_url: Option<String>,
}

impl CartLine {
    fn from_product(product: &Product, quantity: i32) -> Self {
        Self {
            product_id: product.id,
            quantity,
            title: product.title.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
        }
    }

    /// `price * quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Ordered list of cart lines, plus the VNPay order it was checked out into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    #[serde(default)]
    pending_order: Option<OrderId>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    /// Sum of line subtotals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// The unpaid VNPay order this cart was checked out into, if any.
    #[must_use]
    pub const fn pending_order(&self) -> Option<OrderId> {
        self.pending_order
    }

    /// Tag the cart with the order created from it at checkout.
    pub const fn set_pending_order(&mut self, order_id: OrderId) {
        self.pending_order = Some(order_id);
    }

    /// Add `quantity` units of a product, merging with an existing line.
    ///
    /// Title, price and image are snapshotted when the line is first added.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a non-positive quantity, `NotFound` for an
    /// unknown product, `OutOfStock` if the cumulative quantity would exceed
    /// current stock.
    #[instrument(skip(self, store))]
    pub async fn add<S: ProductStore>(
        &mut self,
        store: &S,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<&CartLine> {
        require_positive(quantity)?;
        let product = load_product(store, product_id).await?;

        let position = self.position(product_id);
        let existing = position
            .and_then(|index| self.lines.get(index))
            .map_or(0, |line| line.quantity);
        let requested = existing
            .checked_add(quantity)
            .ok_or_else(|| CommerceError::InvalidArgument(format!("quantity {quantity}")))?;

        if !product.can_supply(requested) {
            return Err(CommerceError::OutOfStock {
                product_id,
                requested,
                available: product.stock_quantity,
            });
        }

        self.pending_order = None;
        let index = match position {
            Some(index) => index,
            None => {
                self.lines.push(CartLine::from_product(&product, 0));
                self.lines.len() - 1
            }
        };
        let line = self
            .lines
            .get_mut(index)
            .ok_or_else(|| CommerceError::InvalidArgument("cart line vanished".to_owned()))?;
        line.quantity = requested;
        Ok(line)
    }

    /// Set the quantity of a product already in the cart.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a non-positive quantity, `NotFound` if the
    /// product is not in the cart or the catalog, `OutOfStock` if the
    /// quantity exceeds current stock.
    #[instrument(skip(self, store))]
    pub async fn update_quantity<S: ProductStore>(
        &mut self,
        store: &S,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<&CartLine> {
        require_positive(quantity)?;
        let index = self.position(product_id).ok_or_else(|| CommerceError::NotFound {
            entity: "cart line",
            id: product_id.to_string(),
        })?;
        let product = load_product(store, product_id).await?;

        if !product.can_supply(quantity) {
            return Err(CommerceError::OutOfStock {
                product_id,
                requested: quantity,
                available: product.stock_quantity,
            });
        }

        self.pending_order = None;
        let line = self.lines.get_mut(index).ok_or_else(|| CommerceError::NotFound {
            entity: "cart line",
            id: product_id.to_string(),
        })?;
        line.quantity = quantity;
        Ok(line)
    }

    /// Drop a product's line. Removing an absent product is a no-op.
    pub fn remove(&mut self, product_id: ProductId) {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        if self.lines.len() != before {
            self.pending_order = None;
        }
    }

    /// Empty the cart and forget any pending order.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.pending_order = None;
    }

    /// Order items for the current lines. Does not modify the cart.
    #[must_use]
    pub fn snapshot(&self) -> Vec<OrderItem> {
        self.lines
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id,
                title: line.title.clone(),
                quantity: line.quantity,
                price: line.price,
            })
            .collect()
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.product_id == product_id)
    }
}

/// A cart together with the session it belongs to.
///
/// Handlers load this from the session, hand it to the engine by `&mut`,
/// and write it back afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartContext {
    pub session_id: String,
    pub cart: Cart,
}

impl CartContext {
    #[must_use]
    pub fn new(session_id: impl Into<String>, cart: Cart) -> Self {
        Self {
            session_id: session_id.into(),
            cart,
        }
    }
}

fn require_positive(quantity: i32) -> Result<()> {
    if quantity <= 0 {
        return Err(CommerceError::InvalidArgument(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(())
}

async fn load_product<S: ProductStore>(store: &S, product_id: ProductId) -> Result<Product> {
    store
        .get_product(product_id)
        .await?
        .ok_or_else(|| CommerceError::product_not_found(product_id))
}
