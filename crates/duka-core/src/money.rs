//! # Money Module
//!
//! Provides the `Money` type for monetary values in minor units.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Buy price 50.00, default markup 30%                                    │
//! │                                                                         │
//! │  Floating point: 50.0 * 1.3 = 65.00000000000001                        │
//! │  Integer cents:  5000 * 13000 / 10000 = 6500  (exact)                  │
//! │                                                                         │
//! │  Every price, line total and report sum is an i64 of minor units.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use duka_core::money::Money;
//!
//! let buy = Money::from_cents(5000);
//! assert_eq!(buy.apply_markup(3000), Some(Money::from_cents(6500)));
//! assert_eq!(buy.checked_multiply_quantity(3), Some(Money::from_cents(15000)));
//! ```
//!
//! Line totals and invoice totals come from the `checked_*` methods; a
//! result that does not fit in `i64` is `None`, never a wrapped value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so that differences (profit = sales − purchases) can go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(100);
    /// assert_eq!(unit_price.checked_multiply_quantity(4), Some(Money::from_cents(400)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, `None` as soon as the running total overflows.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Adds a markup expressed in basis points (3000 = 30%).
    ///
    /// ## Implementation
    /// Integer math with half-up rounding: `(amount * (10000 + bps) + 5000) / 10000`.
    /// `None` when the marked-up amount does not fit in `i64`.
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// let buy = Money::from_cents(5000);
    /// assert_eq!(buy.apply_markup(3000), Some(Money::from_cents(6500)));
    ///
    /// // 0.33 * 1.3 = 0.429 → 0.43
    /// assert_eq!(Money::from_cents(33).apply_markup(3000), Some(Money::from_cents(43)));
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Purchase line: buy 50.00, no existing stock
    ///      │
    ///      ▼
    /// apply_markup(3000) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Sell price: 65.00
    /// ```
    pub fn apply_markup(&self, markup_bps: u32) -> Option<Money> {
        // i128 holds any i64 amount times any u32 factor
        let factor = 10_000i128 + i128::from(markup_bps);
        let cents = (i128::from(self.0) * factor + 5000) / 10_000;
        i64::try_from(cents).ok().map(Money::from_cents)
    }

    /// Formats with a currency symbol, e.g. `"KSh 65.00"` or `"$-5.50"`.
    pub fn format_with(&self, symbol: &str) -> String {
        format!("{}{}", symbol, self)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering without a currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Money::from_cents(cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
        assert_eq!(Money::from_cents(6500).format_with("KSh "), "KSh 65.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.checked_multiply_quantity(3), Some(Money::from_cents(3000)));

        let mut c = a;
        c += b;
        c -= Money::from_cents(200);
        assert_eq!(c.cents(), 1300);
    }

    #[test]
    fn test_default_markup_is_thirty_percent() {
        assert_eq!(Money::from_cents(5000).apply_markup(3000), Some(Money::from_cents(6500)));
        assert_eq!(Money::from_cents(0).apply_markup(3000), Some(Money::zero()));
    }

    #[test]
    fn test_markup_rounds_half_up() {
        // 1.5 cents of markup on 5 cents rounds to 2
        assert_eq!(Money::from_cents(5).apply_markup(3000), Some(Money::from_cents(7)));
        assert_eq!(Money::from_cents(33).apply_markup(3000), Some(Money::from_cents(43)));
    }

    #[test]
    fn test_markup_past_i64_is_none() {
        assert_eq!(Money::from_cents(i64::MAX / 2).apply_markup(3000), None);
        assert!(Money::from_cents(i64::MAX / 2).apply_markup(0).is_some());
    }

    #[test]
    fn test_checked_sum() {
        let total = Money::checked_sum([100, 250, 650].into_iter().map(Money::from_cents));
        assert_eq!(total, Some(Money::from_cents(1000)));
        assert_eq!(Money::checked_sum(std::iter::empty()), Some(Money::zero()));
    }

    #[test]
    fn test_overflow_is_none_not_wrapped() {
        let half = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(half.checked_add(half), None);
        assert_eq!(Money::checked_sum([half, half]), None);
        assert_eq!(half.checked_multiply_quantity(2), None);
        assert_eq!(Money::from_cents(-5).checked_multiply_quantity(3), Some(Money::from_cents(-15)));
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
    }
}
