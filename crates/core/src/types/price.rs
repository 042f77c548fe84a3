//! Prices in Vietnamese dong using decimal arithmetic.
//!
//! The store works in a single currency (VND). The payment gateway expects
//! amounts in "minor units", which for VNPay means the dong amount multiplied
//! by 100, so conversions in both directions live here.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Factor between a dong amount and the gateway's minor-unit integer.
const MINOR_UNITS_PER_DONG: i64 = 100;

/// A non-currency-converting VND amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero dong.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of dong.
    #[must_use]
    pub fn from_dong(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(&self, quantity: i32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Gateway representation (amount x 100), rounded to the nearest integer.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        (self.0 * Decimal::from(MINOR_UNITS_PER_DONG))
            .round()
            .to_i64()
    }

    /// Inverse of [`Price::to_minor_units`].
    #[must_use]
    pub fn from_minor_units(minor: i64) -> Self {
        Self(Decimal::from(minor) / Decimal::from(MINOR_UNITS_PER_DONG))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ₫", self.0.normalize())
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        Ok(Self(<Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units_conversion() {
        let price = Price::from_dong(150_000);
        assert_eq!(price.to_minor_units(), Some(15_000_000));
        assert_eq!(Price::from_minor_units(15_000_000), price);
    }

    #[test]
    fn test_times_and_sum() {
        let lines = [Price::from_dong(20_000).times(2), Price::from_dong(5_000).times(3)];
        let total: Price = lines.into_iter().sum();
        assert_eq!(total, Price::from_dong(55_000));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_dong(99_000).to_string(), "99000 ₫");
    }

    #[test]
    fn test_is_negative() {
        assert!(Price::from_dong(-1).is_negative());
        assert!(!Price::ZERO.is_negative());
    }
}
