//! Whole-unit money and percentage rates.
//!
//! The currency used by Layerbank has no fractional sub-units, so every
//! amount is a signed count of whole units. Rates are held as basis points
//! (1 % = 100 bps) and every conversion from a rate to an amount names its
//! rounding explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Signed amount of whole currency units.
///
/// Negative values only ever appear as balances of overdrawn accounts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero units
    pub const ZERO: Self = Self(0);

    /// Creates an amount from whole units
    #[must_use]
    pub const fn new(units: i64) -> Self {
        Self(units)
    }

    /// Returns the amount in whole units
    #[must_use]
    pub const fn units(self) -> i64 {
        self.0
    }

    /// Checks if the amount is strictly greater than zero
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checks if the amount is strictly below zero
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute value of the amount
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Multiplies by `numerator / denominator`, rounding half away from zero.
    ///
    /// A zero denominator yields [`Money::ZERO`].
    #[must_use]
    pub fn scale(self, numerator: i64, denominator: i64) -> Self {
        Self(div_round_half_up(
            i128::from(self.0) * i128::from(numerator),
            i128::from(denominator),
        ))
    }

    /// Multiplies by `numerator / denominator`, rounding toward positive infinity.
    ///
    /// A zero denominator yields [`Money::ZERO`].
    #[must_use]
    pub fn scale_ceil(self, numerator: i64, denominator: i64) -> Self {
        Self(div_ceil(
            i128::from(self.0) * i128::from(numerator),
            i128::from(denominator),
        ))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Self(units)
    }
}

impl fmt::Display for Money {
    /// Formats with thousands separators, e.g. `-101,500`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        if self.0 < 0 {
            write!(f, "-{grouped}")
        } else {
            write!(f, "{grouped}")
        }
    }
}

/// Percentage rate stored in basis points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(u32);

impl Rate {
    /// 0 %
    pub const ZERO: Self = Self(0);

    /// Basis points in 100 %
    pub const BPS_PER_UNIT: i64 = 10_000;

    /// Creates a rate from basis points (`150` is 1.5 %)
    #[must_use]
    pub const fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    /// Creates a rate from whole percent (`20` is 20 %)
    #[must_use]
    pub const fn from_percent(percent: u32) -> Self {
        Self(percent.saturating_mul(100))
    }

    /// Returns the rate in basis points
    #[must_use]
    pub const fn bps(self) -> u32 {
        self.0
    }

    /// Applies the rate to an amount, rounding half away from zero
    #[must_use]
    pub fn of(self, amount: Money) -> Money {
        amount.scale(i64::from(self.0), Self::BPS_PER_UNIT)
    }

    /// Applies the rate to an amount, rounding up to the next whole unit
    #[must_use]
    pub fn of_ceil(self, amount: Money) -> Money {
        amount.scale_ceil(i64::from(self.0), Self::BPS_PER_UNIT)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{whole}%")
        } else if frac % 10 == 0 {
            write!(f, "{whole}.{}%", frac / 10)
        } else {
            write!(f, "{whole}.{frac:02}%")
        }
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

fn div_round_half_up(numerator: i128, denominator: i128) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let (n, d) = if denominator < 0 {
        (-numerator, -denominator)
    } else {
        (numerator, denominator)
    };
    let half = d / 2;
    let rounded = if n >= 0 { (n + half) / d } else { (n - half) / d };
    saturate(rounded)
}

fn div_ceil(numerator: i128, denominator: i128) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let (n, d) = if denominator < 0 {
        (-numerator, -denominator)
    } else {
        (numerator, denominator)
    };
    let quotient = n / d;
    let ceiled = if n % d > 0 { quotient + 1 } else { quotient };
    saturate(ceiled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_rounds_half_up() {
        // 0.5 % of 50,000 = 250 exactly
        assert_eq!(Rate::from_bps(50).of(Money::new(50_000)), Money::new(250));
        // 0.5 % of 301 = 1.505 -> 2
        assert_eq!(Rate::from_bps(50).of(Money::new(301)), Money::new(2));
        // 0.5 % of 299 = 1.495 -> 1
        assert_eq!(Rate::from_bps(50).of(Money::new(299)), Money::new(1));
    }

    #[test]
    fn test_rate_ceil_rounds_up() {
        assert_eq!(Rate::from_bps(150).of_ceil(Money::new(100_000)), Money::new(1_500));
        assert_eq!(Rate::from_bps(150).of_ceil(Money::new(101)), Money::new(2));
        assert_eq!(Rate::ZERO.of_ceil(Money::new(101)), Money::ZERO);
    }

    #[test]
    fn test_scale_negative_rounds_away_from_zero() {
        assert_eq!(Money::new(-15).scale(1, 10), Money::new(-2));
        assert_eq!(Money::new(15).scale(1, 10), Money::new(2));
        assert_eq!(Money::new(15).scale(1, 0), Money::ZERO);
    }

    #[test]
    fn test_money_display_groups_thousands() {
        assert_eq!(Money::new(0).to_string(), "0");
        assert_eq!(Money::new(999).to_string(), "999");
        assert_eq!(Money::new(48_750).to_string(), "48,750");
        assert_eq!(Money::new(-101_500).to_string(), "-101,500");
        assert_eq!(Money::new(1_000_000).to_string(), "1,000,000");
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(Rate::from_percent(20).to_string(), "20%");
        assert_eq!(Rate::from_bps(150).to_string(), "1.5%");
        assert_eq!(Rate::from_bps(325).to_string(), "3.25%");
    }

    #[test]
    fn test_money_arithmetic() {
        let total: Money = [Money::new(1), Money::new(2), Money::new(3)].into_iter().sum();
        assert_eq!(total, Money::new(6));
        assert_eq!(-Money::new(5), Money::new(-5));
        assert_eq!(Money::new(-7).abs(), Money::new(7));
    }
}
