//! Core types for Soko.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod phone;
pub mod pricing;
pub mod status;

pub use id::*;
pub use money::Money;
pub use phone::{MsisdnKe, PhoneError, is_valid_phone, normalize_phone};
pub use pricing::{FareSchedule, PricingError, errand_price};
pub use status::*;
