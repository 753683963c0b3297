//! Business logic services.
//!
//! # Services
//!
//! - `payments` - STK push initiation and callback settlement

pub mod payments;

pub use payments::{
    InitiatePayment, NewPaymentRequest, PaymentError, PaymentLedger, PaymentOutcome,
    PaymentService, Settlement, SettlementOutcome,
};
