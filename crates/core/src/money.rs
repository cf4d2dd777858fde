use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// A currency amount, fixed to two decimal places.
///
/// Signed: bank debits (outflows) carry a negative amount, expense totals
/// are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Two amounts reconcile when they differ by strictly less than this.
    pub const TOLERANCE: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100)).round().to_i64().unwrap_or(0)
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    /// True when `self` and `other` differ by less than [`Money::TOLERANCE`].
    pub fn within_tolerance(self, other: Money) -> bool {
        (self - other).abs() < Money::TOLERANCE
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_sign_negative() {
            write!(f, "-${:.2}", self.0.abs())
        } else {
            write!(f, "${:.2}", self.0)
        }
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money::from_decimal)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_trip() {
        assert_eq!(Money::from_cents(10250).to_cents(), 10250);
        assert_eq!(Money::from_cents(-5000).to_cents(), -5000);
    }

    #[test]
    fn within_tolerance_boundary() {
        let total = Money::from_cents(10250);
        assert!(total.within_tolerance(Money::from_cents(10250)));
        // Exactly one cent apart is NOT within tolerance (strict <).
        assert!(!total.within_tolerance(Money::from_cents(10251)));
        assert!(!total.within_tolerance(Money::from_cents(10252)));
    }

    #[test]
    fn abs_and_negation() {
        let debit = Money::from_cents(-4999);
        assert!(debit.is_negative());
        assert_eq!(debit.abs(), Money::from_cents(4999));
        assert_eq!(-debit, Money::from_cents(4999));
    }

    #[test]
    fn parses_from_plain_decimal_string() {
        assert_eq!("102.50".parse::<Money>().unwrap(), Money::from_cents(10250));
        assert_eq!("-5".parse::<Money>().unwrap(), Money::from_cents(-500));
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn display_formats_sign_outside_symbol() {
        assert_eq!(Money::from_cents(12345).to_string(), "$123.45");
        assert_eq!(Money::from_cents(-500).to_string(), "-$5.00");
    }

    #[test]
    fn zero_is_not_negative() {
        assert!(!Money::zero().is_negative());
        assert!(Money::zero().is_zero());
    }
}
