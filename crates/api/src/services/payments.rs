//! Mobile-money payments.
//!
//! 1. [`PaymentService::initiate`] validates the phone and amount, sends an
//!    STK push and records the gateway's request ids against the order
//! 2. The customer enters their PIN (or doesn't)
//! 3. [`PaymentService::settle`] applies the gateway callback exactly once
//!
//! Persistence goes through [`PaymentLedger`] so settlement can be exercised
//! without a database.

use std::future::Future;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use soko_core::{Money, MsisdnKe, OrderId, PhoneError, parse_uuid};

use crate::db::RepositoryError;
use crate::models::PaymentRequest;
use crate::mpesa::{MpesaError, PaymentGateway, StkCallback, StkPush};

/// Message shown to the customer once the prompt is on their phone.
pub const PROMPT_SENT_MESSAGE: &str =
    "Payment request sent. Check your phone to complete payment.";

const TRANSACTION_DESC: &str = "Soko order";

/// Errors that can occur while taking a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The phone number is not a Kenyan mobile number.
    #[error(transparent)]
    InvalidPhone(#[from] PhoneError),

    /// The amount is zero or negative.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// No order with this id.
    #[error("order {0} not found")]
    UnknownOrder(OrderId),

    /// The gateway could not be reached or failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] MpesaError),

    /// Recording the payment failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] RepositoryError),
}

/// Request to charge a customer for an order.
#[derive(Debug, Clone)]
pub struct InitiatePayment {
    pub order_id: OrderId,
    /// Phone as the customer typed it.
    pub phone: String,
    pub amount: Decimal,
}

/// Result of an initiation, mirrored to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOutcome {
    /// Whether the prompt reached the customer's phone.
    pub accepted: bool,
    /// Text to show the customer.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_request_id: Option<String>,
}

/// What a callback did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Payment succeeded and the order is now paid.
    Settled { order_id: OrderId },
    /// Payment failed; the order is untouched.
    Failed { order_id: OrderId, result_code: i64 },
    /// The callback was already processed; nothing was written.
    Duplicate { order_id: OrderId },
    /// The callback matches no known payment or order.
    Ignored,
}

/// A payment request to remember until its callback arrives.
#[derive(Debug, Clone)]
pub struct NewPaymentRequest {
    pub order_id: OrderId,
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub phone: MsisdnKe,
    pub amount: Decimal,
}

/// Everything needed to mark an order paid.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub order_id: OrderId,
    /// Tracked payment request, if the push was recorded.
    pub request_id: Option<Uuid>,
    pub merchant_request_id: String,
    /// Amount paid; `None` falls back to the order total.
    pub amount: Option<Decimal>,
    /// Gateway receipt number (`MpesaReceiptNumber`).
    pub receipt: Option<String>,
    /// Stored on the ledger entry.
    pub metadata: serde_json::Value,
}

/// Storage for payment requests and their settlement.
///
/// Implementations must apply [`complete`](Self::complete) atomically: the
/// order update, the ledger entry and resolving the request happen together
/// or not at all.
pub trait PaymentLedger: Send + Sync {
    /// Whether the order exists.
    fn order_exists(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Remember an accepted push.
    fn record_request(
        &self,
        request: NewPaymentRequest,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Find a request by checkout id, falling back to merchant request id.
    fn find_request(
        &self,
        checkout_request_id: &str,
        merchant_request_id: &str,
    ) -> impl Future<Output = Result<Option<PaymentRequest>, RepositoryError>> + Send;

    /// Mark the order paid and write the ledger entry.
    ///
    /// Returns `false` (and writes nothing) if this payment was already applied.
    fn complete(
        &self,
        settlement: Settlement,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Mark a tracked request failed.
    ///
    /// Returns `false` if it was already resolved.
    fn fail(
        &self,
        request_id: Uuid,
        result_code: i64,
        result_desc: &str,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// Payment orchestration over a gateway and a ledger.
pub struct PaymentService<G, L> {
    gateway: G,
    ledger: L,
}

impl<G: PaymentGateway, L: PaymentLedger> PaymentService<G, L> {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(gateway: G, ledger: L) -> Self {
        Self { gateway, ledger }
    }

    /// Ask the customer's phone for payment.
    ///
    /// A gateway rejection (bad shortcode, invalid number on its side, ...) is
    /// reported as `accepted: false` with the gateway's message rather than
    /// as an error, so the client can show it.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidPhone`/`InvalidAmount` for bad input,
    /// `UnknownOrder` if the order doesn't exist, `Gateway` if the gateway is
    /// unreachable, and `Ledger` if the request cannot be recorded.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn initiate(&self, request: InitiatePayment) -> Result<PaymentOutcome, PaymentError> {
        let phone = MsisdnKe::parse(&request.phone)?;
        let amount = Money::new(request.amount);
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount);
        }
        if !self.ledger.order_exists(request.order_id).await? {
            return Err(PaymentError::UnknownOrder(request.order_id));
        }

        let charged = amount.whole_shillings_ceil();
        let push = StkPush {
            phone: phone.clone(),
            amount: charged,
            account_reference: request.order_id.to_string(),
            description: TRANSACTION_DESC.to_string(),
        };

        let response = match self.gateway.stk_push(push).await {
            Ok(response) => response,
            Err(MpesaError::Api { code, message }) => {
                warn!(%code, %message, phone = %phone.masked(), "STK push rejected");
                return Ok(PaymentOutcome {
                    accepted: false,
                    message,
                    merchant_request_id: None,
                    checkout_request_id: None,
                });
            }
            Err(e) => return Err(e.into()),
        };

        self.ledger
            .record_request(NewPaymentRequest {
                order_id: request.order_id,
                merchant_request_id: response.merchant_request_id.clone(),
                checkout_request_id: response.checkout_request_id.clone(),
                phone: phone.clone(),
                amount: Decimal::from(charged),
            })
            .await?;

        info!(
            checkout_request_id = %response.checkout_request_id,
            phone = %phone.masked(),
            amount = charged,
            "STK push sent"
        );

        Ok(PaymentOutcome {
            accepted: true,
            message: PROMPT_SENT_MESSAGE.to_string(),
            merchant_request_id: Some(response.merchant_request_id),
            checkout_request_id: Some(response.checkout_request_id),
        })
    }

    /// Apply a gateway callback.
    ///
    /// The order is found through the recorded payment request (by checkout
    /// id, then merchant request id); if none was recorded, a merchant request
    /// id that is itself an order id is accepted. A callback for a request
    /// that was already resolved is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Ledger` if storage fails.
    #[instrument(
        skip(self, callback),
        fields(
            checkout_request_id = %callback.checkout_request_id,
            result_code = callback.result_code
        )
    )]
    pub async fn settle(&self, callback: &StkCallback) -> Result<SettlementOutcome, PaymentError> {
        let tracked = self
            .ledger
            .find_request(&callback.checkout_request_id, &callback.merchant_request_id)
            .await?;

        let (order_id, request) = match tracked {
            Some(request) if request.is_resolved() => {
                info!(order_id = %request.order_id, "Duplicate callback ignored");
                return Ok(SettlementOutcome::Duplicate {
                    order_id: request.order_id,
                });
            }
            Some(request) => (request.order_id, Some(request)),
            None => match self.untracked_order(&callback.merchant_request_id).await? {
                Some(order_id) => (order_id, None),
                None => {
                    warn!(
                        merchant_request_id = %callback.merchant_request_id,
                        "Callback matches no payment request or order"
                    );
                    return Ok(SettlementOutcome::Ignored);
                }
            },
        };

        if !callback.is_success() {
            let applied = match &request {
                Some(request) => {
                    self.ledger
                        .fail(request.id, callback.result_code, &callback.result_desc)
                        .await?
                }
                None => true,
            };
            info!(%order_id, desc = %callback.result_desc, "Payment failed");
            return Ok(if applied {
                SettlementOutcome::Failed {
                    order_id,
                    result_code: callback.result_code,
                }
            } else {
                SettlementOutcome::Duplicate { order_id }
            });
        }

        let settlement = Settlement {
            order_id,
            request_id: request.as_ref().map(|r| r.id),
            merchant_request_id: callback.merchant_request_id.clone(),
            amount: callback.amount().or_else(|| request.as_ref().map(|r| r.amount)),
            receipt: callback.receipt_number(),
            metadata: settlement_metadata(callback),
        };

        if self.ledger.complete(settlement).await? {
            info!(%order_id, receipt = ?callback.receipt_number(), "Payment settled");
            Ok(SettlementOutcome::Settled { order_id })
        } else {
            info!(%order_id, "Payment already settled");
            Ok(SettlementOutcome::Duplicate { order_id })
        }
    }

    async fn untracked_order(
        &self,
        merchant_request_id: &str,
    ) -> Result<Option<OrderId>, PaymentError> {
        let Some(uuid) = parse_uuid(merchant_request_id) else {
            return Ok(None);
        };
        let order_id = OrderId::from(uuid);
        Ok(self
            .ledger
            .order_exists(order_id)
            .await?
            .then_some(order_id))
    }
}

/// Ledger metadata for a successful callback.
fn settlement_metadata(callback: &StkCallback) -> serde_json::Value {
    json!({
        "merchant_request_id": callback.merchant_request_id,
        "checkout_request_id": callback.checkout_request_id,
        "receipt": callback.receipt_number(),
        "phone": callback.phone_number(),
        "transaction_date": callback.transaction_date(),
        "result_desc": callback.result_desc,
    })
}
