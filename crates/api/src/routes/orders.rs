//! Order status updates.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::{info, instrument};

use soko_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::AppError;
use crate::models::Order;
use crate::state::AppState;

/// Request body for a status change.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}

/// Move an order to a new status.
///
/// PATCH /api/orders/{id}/status
///
/// Illegal transitions and lost races answer 409.
#[instrument(skip(state, body), fields(status = %body.status))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<UpdateOrderStatus>,
) -> Result<Json<Order>, AppError> {
    let order = OrderRepository::new(state.pool())
        .transition_status(id, body.status)
        .await?;

    info!(order_id = %order.id, status = %order.status, "Order status updated");
    Ok(Json(order))
}
