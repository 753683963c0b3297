//! Payment request and ledger transaction types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use soko_core::{OrderId, TransactionId, TransactionProvider, TransactionStatus, UserId};

/// An STK push sent to a customer's phone, awaiting the gateway callback.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentRequest {
    pub id: Uuid,
    pub order_id: OrderId,
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    /// Normalized MSISDN the prompt was sent to.
    pub phone: String,
    pub amount: Decimal,
    /// `pending` until the callback arrives, then `completed` or `failed`.
    pub status: TransactionStatus,
    pub result_code: Option<i32>,
    pub result_desc: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PaymentRequest {
    /// Whether the callback for this request has already been processed.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status != TransactionStatus::Pending
    }
}

/// A ledger entry recording money that moved.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: Option<UserId>,
    pub order_id: Option<OrderId>,
    pub provider: TransactionProvider,
    pub status: TransactionStatus,
    pub amount: Decimal,
    /// Provider receipt number, when known.
    pub reference: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
