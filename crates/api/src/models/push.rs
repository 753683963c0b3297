//! Web push subscription types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use soko_core::{PushSubscriptionId, UserId};

/// A browser push endpoint registered by a user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PushSubscription {
    pub id: PushSubscriptionId,
    pub user_id: UserId,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: DateTime<Utc>,
}

/// Subscription keys exactly as the browser's `PushSubscription.toJSON()` emits them.
#[derive(Debug, Clone, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}
