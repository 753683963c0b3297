//! Ride status updates.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::{info, instrument};

use soko_core::{DriverId, RideId, RideStatus};

use crate::db::RideRepository;
use crate::error::AppError;
use crate::models::Ride;
use crate::state::AppState;

/// Request body for a status change.
#[derive(Debug, Deserialize)]
pub struct UpdateRideStatus {
    pub status: RideStatus,
    /// Required when accepting.
    #[serde(default)]
    pub driver_id: Option<DriverId>,
}

/// Move a ride to a new status.
///
/// PATCH /api/rides/{id}/status
#[instrument(skip(state, body), fields(status = %body.status))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<RideId>,
    Json(body): Json<UpdateRideStatus>,
) -> Result<Json<Ride>, AppError> {
    if body.status == RideStatus::Accepted && body.driver_id.is_none() {
        return Err(AppError::BadRequest(
            "driver_id is required to accept a ride".to_string(),
        ));
    }

    let ride = RideRepository::new(state.pool())
        .transition_status(id, body.status, body.driver_id)
        .await?;

    info!(ride_id = %ride.id, status = %ride.status, "Ride status updated");
    Ok(Json(ride))
}
