//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use soko_core::{
    DriverId, OrderId, OrderStatus, PaymentStatus, RestaurantId, SellerId, TransactionProvider,
    UserId,
};

/// A customer order for food or products.
///
/// Exactly one of `restaurant_id` and `seller_id` is normally set; the schema
/// does not enforce it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub restaurant_id: Option<RestaurantId>,
    pub seller_id: Option<SellerId>,
    pub driver_id: Option<DriverId>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<TransactionProvider>,
    pub total_amount: Decimal,
    pub delivery_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
