//! Chat and notification repositories.

use sqlx::PgPool;

use soko_core::{ChatId, OrderId, UserId};

use super::RepositoryError;
use crate::models::{Chat, Notification};

const CHAT_COLUMNS: &str =
    "id, sender_id, receiver_id, order_id, ride_id, message, is_read, created_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, title, body, is_read, created_at";

/// Repository for chat messages.
pub struct ChatRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChatRepository<'a> {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Send a message, optionally about an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if either user or the order doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn send(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        order_id: Option<OrderId>,
        message: &str,
    ) -> Result<Chat, RepositoryError> {
        sqlx::query_as::<_, Chat>(&format!(
            r"
            INSERT INTO chats (sender_id, receiver_id, order_id, message)
            VALUES ($1, $2, $3, $4)
            RETURNING {CHAT_COLUMNS}
            "
        ))
        .bind(sender_id)
        .bind(receiver_id)
        .bind(order_id)
        .bind(message)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::Conflict("unknown user or order".to_owned());
            }
            RepositoryError::Database(e)
        })
    }

    /// Mark a message read by its receiver.
    ///
    /// Returns `false` if the message doesn't exist, belongs to someone else,
    /// or was already read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_read(&self, id: ChatId, receiver_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE chats SET is_read = TRUE WHERE id = $1 AND receiver_id = $2 AND NOT is_read",
        )
        .bind(id)
        .bind(receiver_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Repository for in-app notifications.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a notification to a user's inbox.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        title: &str,
        body: &str,
    ) -> Result<Notification, RepositoryError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r"
            INSERT INTO notifications (user_id, title, body)
            VALUES ($1, $2, $3)
            RETURNING {NOTIFICATION_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(title)
        .bind(body)
        .fetch_one(self.pool)
        .await?;

        Ok(notification)
    }

    /// Unread notifications for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread(&self, user_id: UserId) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE user_id = $1 AND NOT is_read
            ORDER BY created_at DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(notifications)
    }
}
