//! Offline checks for phone numbers and prices.
//!
//! These run the same functions the API uses, so support staff can answer
//! "why was my number rejected" or "what will this ride cost" without a
//! database.

use rust_decimal::Decimal;
use soko_core::{FareSchedule, Money, PricingError, Urgency, errand_price, is_valid_phone, normalize_phone};

/// Print the normalized form of `input` and whether it is a payable number.
pub fn phone(input: &str) {
    let normalized = normalize_phone(input);
    let valid = is_valid_phone(&normalized);

    #[allow(clippy::print_stdout)]
    {
        println!("input:      {input}");
        println!("normalized: {normalized}");
        println!("valid:      {valid}");
    }
}

/// Print the fare for a trip of `distance_km` under the given tariff.
///
/// # Errors
///
/// Returns an error if any value is negative.
pub fn fare(base_fare: Decimal, per_km: Decimal, distance_km: Decimal) -> Result<(), PricingError> {
    let tariff = FareSchedule::new(Money::new(base_fare), Money::new(per_km))?;
    let total = tariff.preview(distance_km)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{} + {distance_km} km x {} = {total}", tariff.base_fare, tariff.per_km);
    }
    Ok(())
}

/// Print the price of an errand at the given urgency.
///
/// # Errors
///
/// Returns an error if the base price is negative or the price overflows.
pub fn errand(base_price: Decimal, urgency: Urgency) -> Result<(), PricingError> {
    let base = Money::new(base_price);
    let price = errand_price(base, urgency)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{base} x {} ({urgency}) = {price}", urgency.multiplier());
    }
    Ok(())
}
