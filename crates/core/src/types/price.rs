//! Whole-unit price representation.
//!
//! The QKart backend prices products and wallets in whole currency units
//! (no cents), so a price is a plain integer amount. Arithmetic saturates
//! instead of overflowing.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use serde::{Deserialize, Serialize};

/// An amount of money in whole currency units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(0);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the amount in whole currency units.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(quantity)))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_times() {
        assert_eq!(Price::new(10).times(3), Price::new(30));
        assert_eq!(Price::new(10).times(0), Price::ZERO);
    }

    #[test]
    fn test_times_saturates() {
        assert_eq!(Price::new(i64::MAX).times(2), Price::new(i64::MAX));
    }

    #[test]
    fn test_sum() {
        let total: Price = [Price::new(5), Price::new(7)].into_iter().sum();
        assert_eq!(total, Price::new(12));

        let empty: Price = core::iter::empty().sum();
        assert_eq!(empty, Price::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::new(5000).to_string(), "$5000");
    }

    #[test]
    fn test_deserializes_from_json_number() {
        let price: Price = serde_json::from_str("150").unwrap();
        assert_eq!(price.amount(), 150);
    }
}
