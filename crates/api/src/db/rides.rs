//! Ride repository.

use sqlx::PgPool;

use soko_core::{DriverId, RideId, RideStatus};

use super::RepositoryError;
use crate::models::Ride;

const RIDE_COLUMNS: &str = "id, customer_id, driver_id, pickup_address, pickup_lat, pickup_lng, \
     dropoff_address, dropoff_lat, dropoff_lng, status, fare, created_at, updated_at";

/// Repository for ride database operations.
pub struct RideRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RideRepository<'a> {
    /// Create a new ride repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a ride by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: RideId) -> Result<Option<Ride>, RepositoryError> {
        let ride = sqlx::query_as::<_, Ride>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(ride)
    }

    /// Move a ride to a new status.
    ///
    /// Accepting a ride requires a driver and assigns it in the same statement,
    /// guarded on the ride still being `requested`, so only one of several
    /// drivers racing for the same request succeeds. Later transitions keep
    /// the assigned driver; naming a different one is refused.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ride doesn't exist,
    /// `RepositoryError::Conflict` if the transition is illegal, a driver is
    /// missing for acceptance, the named driver is not the assigned one, or
    /// another update won the race.
    pub async fn transition_status(
        &self,
        id: RideId,
        next: RideStatus,
        driver_id: Option<DriverId>,
    ) -> Result<Ride, RepositoryError> {
        let current = self.get(id).await?.ok_or(RepositoryError::NotFound)?;

        current
            .status
            .transition(next)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;

        let assign = if next == RideStatus::Accepted {
            if driver_id.is_none() {
                return Err(RepositoryError::Conflict(
                    "a driver is required to accept a ride".to_string(),
                ));
            }
            driver_id
        } else {
            if let Some(driver) = driver_id
                && current.driver_id != Some(driver)
            {
                return Err(RepositoryError::Conflict(format!(
                    "ride {id} is not assigned to driver {driver}"
                )));
            }
            None
        };

        let updated = sqlx::query_as::<_, Ride>(&format!(
            r"
            UPDATE rides
            SET status = $1,
                driver_id = COALESCE($2, driver_id),
                updated_at = NOW()
            WHERE id = $3 AND status = $4
            RETURNING {RIDE_COLUMNS}
            "
        ))
        .bind(next)
        .bind(assign)
        .bind(id)
        .bind(current.status)
        .fetch_optional(self.pool)
        .await?;

        updated.ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "ride {id} changed status while updating from {}",
                current.status
            ))
        })
    }
}
