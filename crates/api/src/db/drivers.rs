//! Driver repository.

use sqlx::PgPool;

use soko_core::DriverId;

use super::RepositoryError;
use crate::models::Driver;
use crate::models::driver::Position;

const DRIVER_COLUMNS: &str = "id, user_id, vehicle_type, vehicle_plate, is_online, is_verified, \
     current_lat, current_lng, updated_at";

/// Repository for driver database operations.
pub struct DriverRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DriverRepository<'a> {
    /// Create a new driver repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Toggle whether a driver is accepting work.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the driver doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_online(&self, id: DriverId, is_online: bool) -> Result<Driver, RepositoryError> {
        sqlx::query_as::<_, Driver>(&format!(
            r"
            UPDATE drivers
            SET is_online = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {DRIVER_COLUMNS}
            "
        ))
        .bind(is_online)
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Record a driver's latest position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the driver doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_location(
        &self,
        id: DriverId,
        position: Position,
    ) -> Result<Driver, RepositoryError> {
        sqlx::query_as::<_, Driver>(&format!(
            r"
            UPDATE drivers
            SET current_lat = $1, current_lng = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {DRIVER_COLUMNS}
            "
        ))
        .bind(position.lat)
        .bind(position.lng)
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
