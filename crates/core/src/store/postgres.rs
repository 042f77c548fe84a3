//! `PostgreSQL` store.
//!
//! Tables live in the `shop` schema (see `crates/storefront/migrations/`).
//! Order items, shipping contact and payment details are JSONB documents.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use super::{OrderStore, ProductStore, StockWrite, StoreError};
use crate::types::{
    NewOrder, NewProduct, Order, OrderId, OrderItem, OrderStatus, OrderUpdate, PaymentDetails,
    PaymentMethod, PaymentStatus, Price, Product, ProductId, ShippingInfo, StockStatus, UserId,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    title: String,
    price: Decimal,
    image_url: Option<String>,
    stock_quantity: i32,
    stock_status: StockStatus,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            title: row.title,
            price: Price::new(row.price),
            image_url: row.image_url,
            stock_quantity: row.stock_quantity,
            stock_status: row.stock_status,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    items: Json<Vec<OrderItem>>,
    total_price: Decimal,
    shipping_fee: Decimal,
    shipping_info: Json<ShippingInfo>,
    payment_method: PaymentMethod,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_details: Option<Json<PaymentDetails>>,
    stock_committed: bool,
    committed_items: Json<Vec<OrderItem>>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            items: row.items.0,
            total_price: Price::new(row.total_price),
            shipping_fee: Price::new(row.shipping_fee),
            shipping_info: row.shipping_info.0,
            payment_method: row.payment_method,
            status: row.status,
            payment_status: row.payment_status,
            payment_details: row.payment_details.map(|details| details.0),
            stock_committed: row.stock_committed,
            committed_items: row.committed_items.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, title, price, image_url, stock_quantity, stock_status, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, items, total_price, shipping_fee, shipping_info, \
     payment_method, status, payment_status, payment_details, stock_committed, committed_items, \
     version, created_at, updated_at";

// =============================================================================
// Store
// =============================================================================

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ProductStore for PgStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO shop.products (title, price, image_url, stock_quantity, stock_status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&product.title)
        .bind(product.price.amount())
        .bind(&product.image_url)
        .bind(product.stock_quantity)
        .bind(StockStatus::from_quantity(product.stock_quantity))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<StockWrite, StoreError> {
        // One conditional statement: the quantity check, the new quantity and
        // the derived status are decided together under the row lock.
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE shop.products
            SET stock_quantity = stock_quantity + $2,
                stock_status = (CASE
                    WHEN stock_quantity + $2 <= 0 THEN 'out_of_stock'
                    WHEN stock_quantity + $2 <= $3 THEN 'low_stock'
                    WHEN stock_quantity + $2 <= $4 THEN 'medium_stock'
                    ELSE 'in_stock'
                END)::shop.stock_status,
                updated_at = NOW()
            WHERE id = $1 AND stock_quantity + $2 >= 0
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(delta)
        .bind(StockStatus::LOW_STOCK_MAX)
        .bind(StockStatus::MEDIUM_STOCK_MAX)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(StockWrite::Applied(row.into()));
        }

        let available: Option<i32> =
            sqlx::query_scalar("SELECT stock_quantity FROM shop.products WHERE id = $1")
                .bind(id.as_i32())
                .fetch_optional(&self.pool)
                .await?;

        Ok(available.map_or(StockWrite::NotFound, |available| {
            StockWrite::Insufficient { available }
        }))
    }

    async fn set_stock(&self, id: ProductId, quantity: i32) -> Result<Option<Product>, StoreError> {
        if quantity < 0 {
            return Err(StoreError::DataCorruption(format!(
                "negative stock quantity {quantity}"
            )));
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE shop.products
            SET stock_quantity = $2, stock_status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(quantity)
        .bind(StockStatus::from_quantity(quantity))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

impl OrderStore for PgStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.orders
                (user_id, items, total_price, shipping_fee, shipping_info, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id.as_i32())
        .bind(Json(&order.items))
        .bind(order.total_price.amount())
        .bind(order.shipping_fee.amount())
        .bind(Json(&order.shipping_info))
        .bind(order.payment_method)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_orders(&self, limit: i64, offset: i64) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.orders
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_order(
        &self,
        id: OrderId,
        expected_version: i32,
        update: OrderUpdate,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE shop.orders
            SET status = $3,
                payment_status = $4,
                payment_details = $5,
                stock_committed = $6,
                committed_items = $7,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(expected_version)
        .bind(update.status)
        .bind(update.payment_status)
        .bind(update.payment_details.as_ref().map(Json))
        .bind(update.stock_committed)
        .bind(Json(&update.committed_items))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
