//! Price type for catalog listings.
//!
//! Uses a cents-based integer representation so that listing prices and the
//! derived discount math do not drift through floating-point rounding.
//! On the wire a price is a plain decimal number in major units (`79.99`),
//! which is what the storefront's persisted records have always carried.

use serde::de::{self, Deserializer, Visitor};
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Sub;

/// Number of minor units per major unit.
const CENTS_PER_UNIT: i64 = 100;

/// A listing price in minor units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    /// Amount in minor units.
    pub cents: i64,
}

impl Price {
    /// Create a price from minor units.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Create a price from a decimal amount in major units.
    ///
    /// ```
    /// use dealfront_catalog::Price;
    /// let price = Price::from_decimal(49.99);
    /// assert_eq!(price.cents, 4999);
    /// ```
    pub fn from_decimal(amount: f64) -> Self {
        Self::from_cents((amount * CENTS_PER_UNIT as f64).round() as i64)
    }

    /// A zero price.
    pub const fn zero() -> Self {
        Self::from_cents(0)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Convert to a decimal value in major units.
    pub fn to_decimal(&self) -> f64 {
        self.cents as f64 / CENTS_PER_UNIT as f64
    }

    /// Format the amount with two decimal places (e.g., "49.99").
    pub fn display_amount(&self) -> String {
        format!("{:.2}", self.to_decimal())
    }

    /// Percentage saved going from `self` (the original price) down to `sale`.
    ///
    /// Returns a negative value when `sale` is above the original price and
    /// `0.0` when the original price is zero. Callers render negative values
    /// as a display edge case; it is not an error here.
    pub fn percent_off(&self, sale: Price) -> f64 {
        if self.cents == 0 {
            return 0.0;
        }
        let savings = self.cents - sale.cents;
        (savings as f64 / self.cents as f64) * 100.0
    }

    /// Apply a percentage discount and return the resulting price.
    pub fn discounted_by(&self, percent: f64) -> Price {
        let factor = 1.0 - percent / 100.0;
        Price::from_cents((self.cents as f64 * factor).round() as i64)
    }
}

impl Sub for Price {
    type Output = Price;

    fn sub(self, other: Price) -> Price {
        Price::from_cents(self.cents - other.cents)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_amount())
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.cents % CENTS_PER_UNIT == 0 {
            serializer.serialize_i64(self.cents / CENTS_PER_UNIT)
        } else {
            serializer.serialize_f64(self.to_decimal())
        }
    }
}

impl<'de> serde::Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}

/// Accepts JSON numbers and numeric strings.
///
/// Admin forms historically persisted prices as text, so `"79.99"` must
/// decode the same as `79.99`.
struct PriceVisitor;

impl<'de> Visitor<'de> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a price as a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
        v.checked_mul(CENTS_PER_UNIT)
            .map(Price::from_cents)
            .ok_or_else(|| E::custom("price out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
        let v = i64::try_from(v).map_err(|_| E::custom("price out of range"))?;
        self.visit_i64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
        if !v.is_finite() {
            return Err(E::custom("price must be finite"));
        }
        Ok(Price::from_decimal(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
        let trimmed = v.trim();
        let amount: f64 = trimmed
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))?;
        self.visit_f64(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_from_decimal() {
        assert_eq!(Price::from_decimal(49.99).cents, 4999);
        assert_eq!(Price::from_decimal(100.0).cents, 10000);
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_cents(4999).display_amount(), "49.99");
        assert_eq!(Price::from_cents(500).to_string(), "5.00");
    }

    #[test]
    fn test_percent_off() {
        let original = Price::from_decimal(100.0);
        assert!((original.percent_off(Price::from_decimal(80.0)) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_off_negative_when_sale_above_original() {
        let original = Price::from_decimal(50.0);
        let pct = original.percent_off(Price::from_decimal(75.0));
        assert!(pct < 0.0);
        assert!((pct + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_off_zero_original() {
        assert_eq!(Price::zero().percent_off(Price::from_cents(100)), 0.0);
    }

    #[test]
    fn test_discounted_by() {
        let p = Price::from_decimal(200.0);
        assert_eq!(p.discounted_by(25.0).cents, 15000);
    }

    #[test]
    fn test_serialize_whole_and_fractional() {
        assert_eq!(serde_json::to_string(&Price::from_cents(10000)).unwrap(), "100");
        assert_eq!(serde_json::to_string(&Price::from_cents(7999)).unwrap(), "79.99");
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let a: Price = serde_json::from_str("80").unwrap();
        let b: Price = serde_json::from_str("79.5").unwrap();
        let c: Price = serde_json::from_str("\" 12.25 \"").unwrap();
        assert_eq!(a.cents, 8000);
        assert_eq!(b.cents, 7950);
        assert_eq!(c.cents, 1225);
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        assert!(serde_json::from_str::<Price>("\"cheap\"").is_err());
        assert!(serde_json::from_str::<Price>("true").is_err());
    }
}
