//! Order repository.

use sqlx::PgPool;

use soko_core::{OrderId, OrderStatus};

use super::RepositoryError;
use crate::models::Order;

const ORDER_COLUMNS: &str = "id, customer_id, restaurant_id, seller_id, driver_id, status, \
     payment_status, payment_method, total_amount, delivery_address, created_at, updated_at";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Move an order to a new status.
    ///
    /// The transition is validated against the order's current status, and the
    /// update only applies if the status is still the one that was validated.
    /// Two dashboards racing on the same order therefore cannot both win.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist,
    /// `RepositoryError::Conflict` if the transition is illegal or the status
    /// changed concurrently, and `RepositoryError::Database` for other failures.
    pub async fn transition_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let current = self.get(id).await?.ok_or(RepositoryError::NotFound)?;

        current
            .status
            .transition(next)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;

        let updated = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(next)
        .bind(id)
        .bind(current.status)
        .fetch_optional(self.pool)
        .await?;

        updated.ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "order {id} changed status while updating from {}",
                current.status
            ))
        })
    }
}
