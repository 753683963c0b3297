//! Kenyan shilling amounts using decimal arithmetic.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount in Kenyan shillings (KES).
///
/// The marketplace trades in a single currency, so unlike a general `Price`
/// type this carries no currency code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero shillings.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal number of shillings.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from whole shillings.
    #[must_use]
    pub fn from_shillings(shillings: i64) -> Self {
        Self(Decimal::from(shillings))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Whole shillings, rounding any cents up.
    ///
    /// Mobile money only moves whole shillings, so a KES 99.50 order is
    /// charged KES 100 rather than under-collected.
    #[must_use]
    pub fn whole_shillings_ceil(&self) -> i64 {
        self.0
            .round_dp_with_strategy(0, RoundingStrategy::ToPositiveInfinity)
            .try_into()
            .unwrap_or(i64::MAX)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KES {:.2}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}
