//! Session-related types.
//!
//! Types stored in the session for authentication state and the cart.

use serde::{Deserialize, Serialize};

use lotus_core::UserId;

/// Session-stored user identity.
///
/// Written by the sign-in flow; the storefront only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: String,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the session cart.
    pub const CART: &str = "cart";
}
