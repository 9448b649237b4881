//! # Money Module
//!
//! Provides the `Money` type for stored monetary values and the half-up
//! quantisation used when client decimals enter the system.
//!
//! ## Two Representations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CLIENT BOUNDARY                    STORAGE / ARITHMETIC                │
//! │                                                                         │
//! │  rust_decimal::Decimal   ──quantize──►   Money (i64 cents)             │
//! │  "10.005", "2", "20.01"   2dp half-up    1001, 200, 2001               │
//! │                                                                         │
//! │  Item-total checks run on the raw decimals (price × qty may carry      │
//! │  more than 2 places); everything persisted is whole cents.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use stockbook_core::money::{quantize, Money};
//!
//! let rate = Money::from_cents(1250); // 12.50
//! assert_eq!((rate * 8).cents(), 10000);
//!
//! // 10.005 rounds half-up to 10.01
//! assert_eq!(quantize(Decimal::new(10005, 3)), Decimal::new(1001, 2));
//! assert_eq!(Money::from_decimal(Decimal::new(10005, 3)).unwrap().cents(), 1001);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Decimal places kept for every stored amount.
pub const CURRENCY_DP: u32 = 2;

/// Rounds a decimal to 2 places, ties away from zero (half-up).
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use stockbook_core::money::quantize;
///
/// assert_eq!(quantize(Decimal::new(20010, 3)), Decimal::new(2001, 2)); // 20.010
/// assert_eq!(quantize(Decimal::new(1004, 3)), Decimal::new(100, 2));   // 1.004
/// assert_eq!(quantize(Decimal::new(1005, 3)), Decimal::new(101, 2));   // 1.005
/// ```
pub fn quantize(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// Product.rate_cents ──► PurchaseItem.rate ──► rate × Σqty ──► Purchase.total
///
/// NewSaleItem.price (Decimal) ──quantize──► SaleItem.price ──► Sale.total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a client decimal, rounding to cents half-up.
    ///
    /// Returns `None` when the value does not fit in `i64` cents.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use stockbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(Decimal::new(1299, 2)).unwrap().cents(), 1299);
    /// assert_eq!(Money::from_decimal(Decimal::new(-5, 1)).unwrap().cents(), -50);
    /// ```
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        quantize(value)
            .checked_mul(Decimal::ONE_HUNDRED)?
            .to_i64()
            .map(Money)
    }

    /// Returns the value as a 2-place decimal (for display and JSON).
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, CURRENCY_DP)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit amount by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// let rate = Money::from_cents(299);
    /// assert_eq!(rate.checked_multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(rate.checked_multiply_quantity(i64::MAX), None);
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
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
