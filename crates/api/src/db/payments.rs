//! Payment requests and their settlement in `PostgreSQL`.

use sqlx::PgPool;
use uuid::Uuid;

use soko_core::OrderId;

use super::RepositoryError;
use crate::models::{PaymentRequest, Transaction};
use crate::services::payments::{NewPaymentRequest, PaymentLedger, Settlement};

const TRANSACTION_COLUMNS: &str =
    "id, user_id, order_id, provider, status, amount, reference, metadata, created_at";

const REQUEST_COLUMNS: &str = "id, order_id, merchant_request_id, checkout_request_id, phone, \
     amount, status, result_code, result_desc, created_at, resolved_at";

/// [`PaymentLedger`] backed by the marketplace database.
#[derive(Clone)]
pub struct PgPaymentLedger {
    pool: PgPool,
}

impl PgPaymentLedger {
    /// Create a new ledger.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ledger entries written for an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn transactions_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE order_id = $1 ORDER BY created_at"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}

impl PaymentLedger for PgPaymentLedger {
    async fn order_exists(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn record_request(&self, request: NewPaymentRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO payment_requests
                (order_id, merchant_request_id, checkout_request_id, phone, amount)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(request.order_id)
        .bind(&request.merchant_request_id)
        .bind(&request.checkout_request_id)
        .bind(request.phone.as_str())
        .bind(request.amount)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "payment request {} already recorded",
                    request.checkout_request_id
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn find_request(
        &self,
        checkout_request_id: &str,
        merchant_request_id: &str,
    ) -> Result<Option<PaymentRequest>, RepositoryError> {
        let request = sqlx::query_as::<_, PaymentRequest>(&format!(
            r"
            SELECT {REQUEST_COLUMNS}
            FROM payment_requests
            WHERE checkout_request_id = $1 OR merchant_request_id = $2
            ORDER BY (checkout_request_id = $1) DESC
            LIMIT 1
            "
        ))
        .bind(checkout_request_id)
        .bind(merchant_request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn complete(&self, settlement: Settlement) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Claim the request before touching the order; a concurrent duplicate
        // loses here. Untracked payments have no request row, so they hold the
        // order's row lock across the duplicate check instead.
        let claimed = match settlement.request_id {
            Some(request_id) => {
                sqlx::query(
                    r"
                    UPDATE payment_requests
                    SET status = 'completed', result_code = 0, resolved_at = NOW()
                    WHERE id = $1 AND status = 'pending'
                    ",
                )
                .bind(request_id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
                    == 1
            }
            None => {
                let locked = sqlx::query("SELECT 1 FROM orders WHERE id = $1 FOR UPDATE")
                    .bind(settlement.order_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                if locked.is_none() {
                    tx.rollback().await?;
                    return Err(RepositoryError::NotFound);
                }

                let already: bool = sqlx::query_scalar(
                    r"
                    SELECT EXISTS (
                        SELECT 1 FROM transactions
                        WHERE order_id = $1
                          AND provider = 'mpesa'
                          AND metadata->>'merchant_request_id' = $2
                    )
                    ",
                )
                .bind(settlement.order_id)
                .bind(&settlement.merchant_request_id)
                .fetch_one(&mut *tx)
                .await?;
                !already
            }
        };

        if !claimed {
            tx.rollback().await?;
            return Ok(false);
        }

        let updated = sqlx::query(
            r"
            UPDATE orders
            SET payment_status = 'completed',
                status = CASE WHEN status = 'pending' THEN 'confirmed'::order_status ELSE status END,
                payment_method = 'mpesa',
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(settlement.order_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO transactions (user_id, order_id, provider, status, amount, reference, metadata)
            SELECT o.customer_id, o.id, 'mpesa', 'completed', COALESCE($2, o.total_amount), $3, $4
            FROM orders o
            WHERE o.id = $1
            ",
        )
        .bind(settlement.order_id)
        .bind(settlement.amount)
        .bind(settlement.receipt.as_deref())
        .bind(&settlement.metadata)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn fail(
        &self,
        request_id: Uuid,
        result_code: i64,
        result_desc: &str,
    ) -> Result<bool, RepositoryError> {
        let code = i32::try_from(result_code).unwrap_or(i32::MAX);
        let result = sqlx::query(
            r"
            UPDATE payment_requests
            SET status = 'failed', result_code = $2, result_desc = $3, resolved_at = NOW()
            WHERE id = $1 AND status = 'pending'
            ",
        )
        .bind(request_id)
        .bind(code)
        .bind(result_desc)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
