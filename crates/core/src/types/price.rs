//! Type-safe price representation using decimal arithmetic.
//!
//! The shop sells in Vietnamese dong, which has no minor unit, so prices are
//! whole numbers on the wire (`"price": 350000`). They are kept as
//! [`Decimal`] to avoid float drift when cart lines are summed.

use core::fmt;
use std::iter::Sum;
use std::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price in dong.
///
/// Serializes as a plain JSON number; deserializes from a number or a
/// numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
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

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Formats as `350.000 ₫` (dot-grouped thousands, rounded to whole dong).
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round().abs().to_string();
        let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
        for (i, digit) in rounded.chars().enumerate() {
            if i > 0 && (rounded.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }
        if self.0.is_sign_negative() && !self.0.round().is_zero() {
            write!(f, "-{grouped} ₫")
        } else {
            write!(f, "{grouped} ₫")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::from_dong(350_000).to_string(), "350.000 ₫");
        assert_eq!(Price::from_dong(1_250_000).to_string(), "1.250.000 ₫");
        assert_eq!(Price::from_dong(900).to_string(), "900 ₫");
        assert_eq!(Price::ZERO.to_string(), "0 ₫");
        assert_eq!(Price::from_dong(-5000).to_string(), "-5.000 ₫");
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [Price::from_dong(100_000).times(2), Price::from_dong(50_000)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_dong(250_000));
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let a: Price = serde_json::from_str("350000").unwrap();
        let b: Price = serde_json::from_str("\"350000\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Price::from_dong(350_000));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_value(Price::from_dong(120_000)).unwrap();
        assert!(json.is_number());
    }
}
