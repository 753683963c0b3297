//! Browser push subscription endpoints.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

use soko_core::UserId;

use crate::db::PushSubscriptionRepository;
use crate::error::AppError;
use crate::models::PushSubscription;
use crate::models::push::PushKeys;
use crate::state::AppState;

/// VAPID key response, shaped for `pushManager.subscribe`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidKey {
    pub public_key: String,
}

/// Subscription registration body.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub user_id: UserId,
    pub endpoint: String,
    pub keys: PushKeys,
}

/// Hand out the VAPID public key.
///
/// GET /api/notifications/vapid-public-key
pub async fn vapid_public_key(State(state): State<AppState>) -> Result<Json<VapidKey>, AppError> {
    let key = state.config().vapid_public_key.clone().ok_or_else(|| {
        AppError::ServiceUnavailable("Push notifications are not configured".to_string())
    })?;
    Ok(Json(VapidKey { public_key: key }))
}

/// Register a push endpoint.
///
/// POST /api/notifications/subscriptions
#[instrument(skip(state, body), fields(user_id = %body.user_id))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<PushSubscription>), AppError> {
    validate_endpoint(&body.endpoint)?;
    if body.keys.p256dh.is_empty() || body.keys.auth.is_empty() {
        return Err(AppError::BadRequest("subscription keys are required".to_string()));
    }

    let subscription = PushSubscriptionRepository::new(state.pool())
        .upsert(body.user_id, &body.endpoint, &body.keys)
        .await?;

    info!(subscription_id = %subscription.id, "Push subscription registered");
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Push services only accept HTTPS endpoints.
fn validate_endpoint(endpoint: &str) -> Result<(), AppError> {
    let url = Url::parse(endpoint)
        .map_err(|_| AppError::BadRequest("endpoint must be a URL".to_string()))?;
    if url.scheme() != "https" {
        return Err(AppError::BadRequest("endpoint must use https".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("https://fcm.googleapis.com/fcm/send/abc123").is_ok());
        assert!(validate_endpoint("http://fcm.googleapis.com/fcm/send/abc123").is_err());
        assert!(validate_endpoint("not a url").is_err());
    }
}
