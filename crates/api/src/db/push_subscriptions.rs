//! Push subscription repository.

use sqlx::PgPool;

use soko_core::UserId;

use super::RepositoryError;
use crate::models::PushSubscription;
use crate::models::push::PushKeys;

/// Repository for browser push subscriptions.
pub struct PushSubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PushSubscriptionRepository<'a> {
    /// Create a new push subscription repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register an endpoint for a user, replacing the keys if the endpoint is
    /// already known (browsers rotate keys on resubscribe).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert(
        &self,
        user_id: UserId,
        endpoint: &str,
        keys: &PushKeys,
    ) -> Result<PushSubscription, RepositoryError> {
        sqlx::query_as::<_, PushSubscription>(
            r"
            INSERT INTO push_subscriptions (user_id, endpoint, p256dh, auth)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (endpoint) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth
            RETURNING id, user_id, endpoint, p256dh, auth, created_at
            ",
        )
        .bind(user_id)
        .bind(endpoint)
        .bind(&keys.p256dh)
        .bind(&keys.auth)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::Conflict("unknown user".to_owned());
            }
            RepositoryError::Database(e)
        })
    }
}
