//! Shipping contact captured at checkout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from validating [`ShippingInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShippingInfoError {
    /// A required field is empty or whitespace.
    #[error("shipping {0} is required")]
    Missing(&'static str),
    /// The email address is not shaped like `local@domain`.
    #[error("shipping email is invalid")]
    InvalidEmail,
}

/// Where and to whom an order ships. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

impl ShippingInfo {
    /// Trim every field and check that none is blank and the email is plausible.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn normalized(self) -> Result<Self, ShippingInfoError> {
        let info = Self {
            name: self.name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            email: self.email.trim().to_owned(),
            address: self.address.trim().to_owned(),
        };

        for (field, value) in [
            ("name", &info.name),
            ("phone", &info.phone),
            ("email", &info.email),
            ("address", &info.address),
        ] {
            if value.is_empty() {
                return Err(ShippingInfoError::Missing(field));
            }
        }

        match info.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(info),
            _ => Err(ShippingInfoError::InvalidEmail),
        }
    }
}
