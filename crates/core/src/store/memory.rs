//! In-process store backed by maps under a single async mutex.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use super::{OrderStore, ProductStore, StockWrite, StoreError};
use crate::types::{
    NewOrder, NewProduct, Order, OrderId, OrderStatus, OrderUpdate, PaymentStatus, Product,
    ProductId, StockStatus, UserId,
};

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    next_product_id: i32,
    next_order_id: i32,
}

/// Store that keeps everything in memory.
///
/// Cloning is cheap and clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

impl ProductStore for MemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        if product.stock_quantity < 0 {
            return Err(StoreError::DataCorruption(format!(
                "negative stock quantity {}",
                product.stock_quantity
            )));
        }

        let mut tables = self.tables.lock().await;
        tables.next_product_id += 1;
        let product = Product {
            id: ProductId::new(tables.next_product_id),
            title: product.title,
            price: product.price,
            image_url: product.image_url,
            stock_quantity: product.stock_quantity,
            stock_status: StockStatus::from_quantity(product.stock_quantity),
            updated_at: Utc::now(),
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<StockWrite, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(StockWrite::NotFound);
        };

        let Some(quantity) = product
            .stock_quantity
            .checked_add(delta)
            .filter(|quantity| *quantity >= 0)
        else {
            return Ok(StockWrite::Insufficient {
                available: product.stock_quantity,
            });
        };

        product.stock_quantity = quantity;
        product.stock_status = StockStatus::from_quantity(quantity);
        product.updated_at = Utc::now();
        Ok(StockWrite::Applied(product.clone()))
    }

    async fn set_stock(&self, id: ProductId, quantity: i32) -> Result<Option<Product>, StoreError> {
        if quantity < 0 {
            return Err(StoreError::DataCorruption(format!(
                "negative stock quantity {quantity}"
            )));
        }

        let mut tables = self.tables.lock().await;
        Ok(tables.products.get_mut(&id).map(|product| {
            product.stock_quantity = quantity;
            product.stock_status = StockStatus::from_quantity(quantity);
            product.updated_at = Utc::now();
            product.clone()
        }))
    }
}

impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.next_order_id += 1;
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(tables.next_order_id),
            user_id: order.user_id,
            items: order.items,
            total_price: order.total_price,
            shipping_fee: order.shipping_fee,
            shipping_info: order.shipping_info,
            payment_method: order.payment_method,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_details: None,
            stock_committed: false,
            committed_items: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn list_orders(&self, limit: i64, offset: i64) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables.orders.values().cloned().collect();
        newest_first(&mut orders);
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(orders.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_order(
        &self,
        id: OrderId,
        expected_version: i32,
        update: OrderUpdate,
    ) -> Result<Option<Order>, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(order) = tables.orders.get_mut(&id) else {
            return Ok(None);
        };
        if order.version != expected_version {
            return Ok(None);
        }

        order.status = update.status;
        order.payment_status = update.payment_status;
        order.payment_details = update.payment_details;
        order.stock_committed = update.stock_committed;
        order.committed_items = update.committed_items;
        order.version += 1;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}
