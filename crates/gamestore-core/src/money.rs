//! # Money
//!
//! Wallet balances, catalog prices and discount amounts, all held as whole
//! cents.
//!
//! ## Where Rounding Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  price A ─┐                                                             │
//! │  price B ─┼─► Σ (exact) ─► × pct / 100 ─► discount (rounded once) ─┐   │
//! │  price C ─┘        │                                                │   │
//! │                    └──────────────── − ─────────────────────────────┴─► │
//! │                                                        amount charged   │
//! │                                                                         │
//! │  Top-ups and debits are exact cent arithmetic. The only rounding step  │
//! │  in the ledger is the discount percentage, half a cent away from 0.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust
//! use gamestore_core::money::Money;
//!
//! let price = Money::from_major_minor(1189, 47);
//! assert_eq!(price.percentage_of(25).cents(), 29_737); // 297.3675
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// An amount in cents. Signed so that subtraction is total; solvency is
/// enforced by the ledger, not the type. Serialized as a bare integer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Ceiling for a single price or top-up: 10,000,000.00.
    pub const MAX_AMOUNT: Money = Money(1_000_000_000);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// `from_major_minor(10, 99)` is 10.99; `from_major_minor(-5, 50)` is -5.50.
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        let minor = if major < 0 { -minor } else { minor };
        Money(major * 100 + minor)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole currency units, truncated toward zero.
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Cents past the whole unit, 0-99.
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    pub const fn zero() -> Self {
        Money(0)
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `percentage`% of this amount, half a cent rounded away from zero.
    ///
    /// ```text
    /// 1189.47 × 25% = 297.3675  → 297.37
    ///    0.50 × 1%  =   0.005   →   0.01
    ///   -0.50 × 1%  =  -0.005   →  -0.01
    /// ```
    pub fn percentage_of(&self, percentage: u32) -> Money {
        // Widened so a large balance times 100 cannot overflow.
        let scaled = i128::from(self.0) * i128::from(percentage);
        let half = if scaled < 0 { -50 } else { 50 };
        Money(((scaled + half) / 100) as i64)
    }

    /// `self + amount`, or `None` on overflow.
    pub fn checked_add(&self, amount: Money) -> Option<Money> {
        self.0.checked_add(amount.0).map(Money)
    }

    /// `self - amount`, or `None` when that would be negative.
    ///
    /// ```rust
    /// use gamestore_core::money::Money;
    ///
    /// let balance = Money::from_cents(10_000);
    /// assert!(balance.checked_debit(Money::from_cents(15_000)).is_none());
    /// assert_eq!(balance.checked_debit(balance), Some(Money::zero()));
    /// ```
    pub fn checked_debit(&self, amount: Money) -> Option<Money> {
        self.0
            .checked_sub(amount.0)
            .filter(|remaining| *remaining >= 0)
            .map(Money)
    }
}

/// `major.minor` with two decimals and no currency symbol; the storefront
/// adds its own.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            f.write_str("-")?;
        }
        write!(f, "{}.{:02}", self.major().abs(), self.minor())
    }
}

macro_rules! money_op {
    ($op:ident, $method:ident, $assign:ident, $assign_method:ident, $sym:tt) => {
        impl $op for Money {
            type Output = Money;

            fn $method(self, rhs: Money) -> Money {
                Money(self.0 $sym rhs.0)
            }
        }

        impl $assign for Money {
            fn $assign_method(&mut self, rhs: Money) {
                *self = *self $sym rhs;
            }
        }
    };
}

money_op!(Add, add, AddAssign, add_assign, +);
money_op!(Sub, sub, SubAssign, sub_assign, -);

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
