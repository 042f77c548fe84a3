//! Catalog product as seen by the reconciliation engine.
//!
//! The catalog owns much more than this (categories, brands, images,
//! descriptions); the engine only needs identity, the display snapshot copied
//! into carts, and the stock counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Price, ProductId, StockStatus};

/// A product with its stock counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    pub image_url: Option<String>,
    /// Units available for sale. Never negative.
    pub stock_quantity: i32,
    /// Always `StockStatus::from_quantity(stock_quantity)`.
    pub stock_status: StockStatus,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` more units could be sold right now.
    #[must_use]
    pub const fn can_supply(&self, quantity: i32) -> bool {
        quantity <= self.stock_quantity
    }
}

/// Input for inserting a catalog product (seeding, tests).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
}

impl NewProduct {
    /// A product with no image.
    #[must_use]
    pub fn new(title: impl Into<String>, price: Price, stock_quantity: i32) -> Self {
        Self {
            title: title.into(),
            price,
            image_url: None,
            stock_quantity,
        }
    }
}
