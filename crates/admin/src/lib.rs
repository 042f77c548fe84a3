//! Lotus Market Admin library.
//!
//! Back-office order management: listing orders, moving them through
//! fulfilment, and correcting payment statuses. Every edit goes through
//! [`lotus_core::OrderDesk`], so stock follows the same rules as checkout.
//!
//! # Security
//!
//! There is no login here. Bind to a private interface only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
