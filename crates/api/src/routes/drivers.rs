//! Driver availability and location.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use soko_core::DriverId;

use crate::db::DriverRepository;
use crate::error::AppError;
use crate::models::Driver;
use crate::models::driver::Position;
use crate::state::AppState;

/// Request body for a location report.
#[derive(Debug, Deserialize)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lng: f64,
}

/// Request body for the availability toggle.
#[derive(Debug, Deserialize)]
pub struct OnlineUpdate {
    pub is_online: bool,
}

/// Record a driver's position.
///
/// PUT /api/drivers/{id}/location
#[instrument(skip(state, body))]
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<DriverId>,
    Json(body): Json<LocationUpdate>,
) -> Result<Json<Driver>, AppError> {
    let position = Position::new(body.lat, body.lng)
        .ok_or_else(|| AppError::BadRequest("coordinates out of range".to_string()))?;

    let driver = DriverRepository::new(state.pool())
        .update_location(id, position)
        .await?;
    Ok(Json(driver))
}

/// Toggle whether a driver is accepting work.
///
/// PUT /api/drivers/{id}/online
#[instrument(skip(state, body), fields(is_online = body.is_online))]
pub async fn set_online(
    State(state): State<AppState>,
    Path(id): Path<DriverId>,
    Json(body): Json<OnlineUpdate>,
) -> Result<Json<Driver>, AppError> {
    let driver = DriverRepository::new(state.pool())
        .set_online(id, body.is_online)
        .await?;
    Ok(Json(driver))
}
