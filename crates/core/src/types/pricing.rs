//! Fare and errand price calculations.
//!
//! Drivers and restaurant operators edit a simple two-part tariff (a base fare
//! plus a per-kilometre rate) and see a live preview; errand runners price a
//! job from a base price scaled by how urgent it is.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::money::Money;
use super::status::Urgency;

/// Errors produced by price calculations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// A distance below zero was supplied.
    #[error("distance cannot be negative")]
    NegativeDistance,
    /// A tariff component below zero was supplied.
    #[error("{0} cannot be negative")]
    NegativeRate(&'static str),
    /// The result does not fit in a decimal.
    #[error("price is too large")]
    Overflow,
}

/// A two-part tariff: a flat base fare plus a per-kilometre rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareSchedule {
    /// Charged on every trip regardless of distance.
    pub base_fare: Money,
    /// Charged per kilometre travelled.
    pub per_km: Money,
}

impl FareSchedule {
    /// Create a tariff, rejecting negative components.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::NegativeRate` if either component is negative.
    pub fn new(base_fare: Money, per_km: Money) -> Result<Self, PricingError> {
        if base_fare.amount().is_sign_negative() && !base_fare.amount().is_zero() {
            return Err(PricingError::NegativeRate("base fare"));
        }
        if per_km.amount().is_sign_negative() && !per_km.amount().is_zero() {
            return Err(PricingError::NegativeRate("per-km rate"));
        }
        Ok(Self { base_fare, per_km })
    }

    /// Preview the fare for a trip of `distance_km` kilometres: `base + km * rate`.
    ///
    /// ```
    /// use rust_decimal::Decimal;
    /// use soko_core::{FareSchedule, Money};
    ///
    /// let tariff = FareSchedule::new(Money::from_shillings(200), Money::from_shillings(50))?;
    /// assert_eq!(tariff.preview(Decimal::from(5))?, Money::from_shillings(450));
    /// # Ok::<(), soko_core::PricingError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `PricingError::NegativeDistance` for negative distances and
    /// `PricingError::Overflow` if the fare does not fit in a decimal.
    pub fn preview(&self, distance_km: Decimal) -> Result<Money, PricingError> {
        if distance_km.is_sign_negative() && !distance_km.is_zero() {
            return Err(PricingError::NegativeDistance);
        }
        distance_km
            .checked_mul(self.per_km.amount())
            .and_then(|distance_cost| self.base_fare.amount().checked_add(distance_cost))
            .map(Money::new)
            .ok_or(PricingError::Overflow)
    }
}

impl Urgency {
    /// Price multiplier applied to an errand's base price.
    #[must_use]
    pub fn multiplier(self) -> Decimal {
        match self {
            Self::Normal => Decimal::ONE,
            Self::Urgent => Decimal::new(15, 1),
            Self::Express => Decimal::TWO,
        }
    }
}

/// Price an errand: `base * multiplier`, rounded to whole shillings.
///
/// Halves round away from zero, so KES 301 urgent (451.5) is KES 452.
///
/// # Errors
///
/// Returns `PricingError::NegativeRate` for a negative base price and
/// `PricingError::Overflow` if the scaled price does not fit in a decimal.
pub fn errand_price(base: Money, urgency: Urgency) -> Result<Money, PricingError> {
    if base.amount().is_sign_negative() && !base.amount().is_zero() {
        return Err(PricingError::NegativeRate("base price"));
    }
    let scaled = base
        .amount()
        .checked_mul(urgency.multiplier())
        .ok_or(PricingError::Overflow)?;
    Ok(Money::new(
        scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tariff(base: i64, per_km: i64) -> FareSchedule {
        FareSchedule::new(Money::from_shillings(base), Money::from_shillings(per_km))
            .expect("valid tariff")
    }

    #[test]
    fn test_fare_preview() {
        let fare = tariff(200, 50).preview(Decimal::from(5)).expect("preview");
        assert_eq!(fare, Money::from_shillings(450));
    }

    #[test]
    fn test_fare_preview_fractional_distance() {
        let fare = tariff(200, 50)
            .preview(Decimal::new(25, 1))
            .expect("preview");
        assert_eq!(fare, Money::from_shillings(325));
    }

    #[test]
    fn test_fare_preview_zero_distance_is_base() {
        let fare = tariff(200, 50).preview(Decimal::ZERO).expect("preview");
        assert_eq!(fare, Money::from_shillings(200));
    }

    #[test]
    fn test_fare_preview_negative_distance() {
        assert_eq!(
            tariff(200, 50).preview(Decimal::from(-1)),
            Err(PricingError::NegativeDistance)
        );
    }

    #[test]
    fn test_fare_schedule_rejects_negative_rates() {
        assert!(FareSchedule::new(Money::from_shillings(-1), Money::ZERO).is_err());
        assert!(FareSchedule::new(Money::ZERO, Money::from_shillings(-1)).is_err());
    }

    #[test]
    fn test_errand_price() {
        let base = Money::from_shillings(300);
        assert_eq!(errand_price(base, Urgency::Normal), Ok(Money::from_shillings(300)));
        assert_eq!(errand_price(base, Urgency::Urgent), Ok(Money::from_shillings(450)));
        assert_eq!(errand_price(base, Urgency::Express), Ok(Money::from_shillings(600)));
    }

    #[test]
    fn test_errand_price_rounds_half_up() {
        assert_eq!(
            errand_price(Money::from_shillings(301), Urgency::Urgent),
            Ok(Money::from_shillings(452))
        );
        assert_eq!(
            errand_price(Money::from_shillings(333), Urgency::Urgent),
            Ok(Money::from_shillings(500))
        );
    }

    #[test]
    fn test_errand_price_rejects_negative_base() {
        assert_eq!(
            errand_price(Money::from_shillings(-1), Urgency::Normal),
            Err(PricingError::NegativeRate("base price"))
        );
    }

    #[test]
    fn test_errand_price_overflow() {
        assert_eq!(
            errand_price(Money::new(Decimal::MAX), Urgency::Express),
            Err(PricingError::Overflow)
        );
    }

    #[test]
    fn test_fare_preview_overflow() {
        let tariff = FareSchedule::new(Money::new(Decimal::MAX), Money::from_shillings(2))
            .expect("valid tariff");
        assert_eq!(tariff.preview(Decimal::TWO), Err(PricingError::Overflow));

        let tariff = FareSchedule::new(Money::ZERO, Money::new(Decimal::MAX)).expect("valid tariff");
        assert_eq!(tariff.preview(Decimal::TWO), Err(PricingError::Overflow));
    }
}
