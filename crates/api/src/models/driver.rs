//! Driver domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use soko_core::{DriverId, UserId};

/// A driver's vehicle and availability.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Driver {
    pub id: DriverId,
    pub user_id: UserId,
    pub vehicle_type: String,
    pub vehicle_plate: String,
    pub is_online: bool,
    pub is_verified: bool,
    /// Last reported latitude.
    pub current_lat: Option<f64>,
    /// Last reported longitude.
    pub current_lng: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// A WGS84 position reported by a driver's device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    /// Build a position, rejecting coordinates outside the valid ranges.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}
