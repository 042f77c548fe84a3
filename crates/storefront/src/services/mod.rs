//! Storefront services.
//!
//! - `email` - Order emails over SMTP and the notifier wired into checkout

pub mod email;

pub use email::{EmailError, EmailService, StorefrontNotifier};
