//! Ride-hailing domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use soko_core::{DriverId, RideId, RideStatus, UserId};

/// A ride request and its progress.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Ride {
    pub id: RideId,
    pub customer_id: UserId,
    /// Set when a driver accepts the ride.
    pub driver_id: Option<DriverId>,
    pub pickup_address: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_address: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub status: RideStatus,
    pub fare: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
