//! Domain types for Lotus Market.
//!
//! Type-safe wrappers and documents shared by the engine, the storefront and
//! the admin back-office.

pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod shipping;
pub mod status;

pub use id::*;
pub use order::{NewOrder, Order, OrderItem, OrderUpdate, PaymentDetails};
pub use price::Price;
pub use product::{NewProduct, Product};
pub use shipping::{ShippingInfo, ShippingInfoError};
pub use status::*;
