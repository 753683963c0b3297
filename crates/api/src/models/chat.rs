//! Chat and in-app notification types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use soko_core::{ChatId, NotificationId, OrderId, RideId, UserId};

/// A message between two users, optionally about an order or a ride.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Chat {
    pub id: ChatId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub order_id: Option<OrderId>,
    pub ride_id: Option<RideId>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// An in-app notification shown in the user's inbox.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
