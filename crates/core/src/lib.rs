//! Lotus Market Core - order, payment and inventory reconciliation.
//!
//! This crate is shared by every Lotus Market component:
//! - `storefront` - Public-facing shop (cart, checkout, VNPay callbacks)
//! - `admin` - Back-office order management
//! - `cli` - Migrations, seeding and stock corrections
//!
//! # Architecture
//!
//! The engine talks to persistence only through the traits in [`store`], so
//! it runs unchanged against `PostgreSQL` (feature `postgres`) or the
//! in-memory store used by tests. There is no HTTP here.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, statuses and order documents
//! - [`stock`] - Atomic stock increments and decrements
//! - [`cart`] - Session cart and its order-item snapshot
//! - [`ledger`] - Order creation and guarded lifecycle transitions
//! - [`gateway`] - VNPay redirect signing and callback verification
//! - [`reconcile`] - The coordinator tying checkout and gateway callbacks together
//! - [`desk`] - Back-office status and payment edits
//! - [`notify`] - Customer notification seam

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod desk;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod notify;
pub mod reconcile;
pub mod stock;
pub mod store;
pub mod types;

pub use cart::{Cart, CartContext, CartLine};
pub use desk::OrderDesk;
pub use error::{CommerceError, Result};
pub use gateway::{GatewayCallback, VnpayConfig, VnpayGateway};
pub use ledger::{Actor, OrderLedger, StockAction, TransitionOutcome, TransitionRequest};
pub use notify::{OrderEvent, OrderNotifier, TracingNotifier};
pub use reconcile::{CheckoutOutcome, Coordinator, IpnResponse, ReturnOutcome};
pub use stock::{AdjustmentReport, ProductStock};
pub use store::{MemoryStore, OrderStore, ProductStore, StockWrite, StoreError};
#[cfg(feature = "postgres")]
pub use store::PgStore;
pub use types::*;
