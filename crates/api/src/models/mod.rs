//! Domain models for the marketplace API.
//!
//! Row types are read with `sqlx::FromRow`; status columns decode straight into
//! the enums from `soko-core`, so an unknown database value is a decode error
//! rather than a silently accepted string.

pub mod chat;
pub mod driver;
pub mod order;
pub mod payment;
pub mod push;
pub mod ride;

pub use chat::{Chat, Notification};
pub use driver::Driver;
pub use order::Order;
pub use payment::{PaymentRequest, Transaction};
pub use push::PushSubscription;
pub use ride::Ride;
