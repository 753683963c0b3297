//! Payment flow against an in-memory ledger and a scripted gateway.
//!
//! The ledger mirrors what `PgPaymentLedger` does inside its transaction, so
//! these tests pin the settlement rules without a database.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use soko_api::db::RepositoryError;
use soko_api::models::PaymentRequest;
use soko_api::mpesa::{MpesaError, PaymentGateway, StkCallback, StkCallbackEnvelope, StkPush, StkPushResponse};
use soko_api::services::{
    InitiatePayment, NewPaymentRequest, PaymentError, PaymentLedger, PaymentService, Settlement,
    SettlementOutcome,
};
use soko_api::services::payments::PROMPT_SENT_MESSAGE;
use soko_core::{OrderId, OrderStatus, PaymentStatus, TransactionStatus};

// ============================================================================
// Test doubles
// ============================================================================

enum GatewayMode {
    Accept,
    Reject,
    Unreachable,
}

struct ScriptedGateway {
    mode: GatewayMode,
    pushes: Mutex<Vec<StkPush>>,
}

impl ScriptedGateway {
    fn new(mode: GatewayMode) -> Self {
        Self {
            mode,
            pushes: Mutex::new(Vec::new()),
        }
    }
}

impl PaymentGateway for &ScriptedGateway {
    async fn stk_push(&self, push: StkPush) -> Result<StkPushResponse, MpesaError> {
        self.pushes.lock().await.push(push);
        match self.mode {
            GatewayMode::Accept => Ok(StkPushResponse {
                merchant_request_id: "29115-34620561-1".to_string(),
                checkout_request_id: "ws_CO_191220191020363925".to_string(),
                response_code: "0".to_string(),
                response_description: "Success. Request accepted for processing".to_string(),
                customer_message: "Success. Request accepted for processing".to_string(),
            }),
            GatewayMode::Reject => Err(MpesaError::Api {
                code: "400.002.02".to_string(),
                message: "Bad Request - Invalid PartyB".to_string(),
            }),
            GatewayMode::Unreachable => Err(MpesaError::AuthenticationFailed(
                "invalid consumer credentials".to_string(),
            )),
        }
    }
}

struct OrderRow {
    status: OrderStatus,
    payment_status: PaymentStatus,
    total: Decimal,
}

struct LedgerEntry {
    order_id: OrderId,
    amount: Decimal,
    reference: Option<String>,
    metadata: serde_json::Value,
}

#[derive(Default)]
struct MemoryLedger {
    orders: Mutex<HashMap<OrderId, OrderRow>>,
    requests: Mutex<Vec<PaymentRequest>>,
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedger {
    async fn with_order(total: i64) -> (Self, OrderId) {
        let ledger = Self::default();
        let order_id = OrderId::new_v4();
        ledger.orders.lock().await.insert(
            order_id,
            OrderRow {
                status: OrderStatus::Pending,
                payment_status: PaymentStatus::Pending,
                total: Decimal::from(total),
            },
        );
        (ledger, order_id)
    }

    async fn order(&self, order_id: OrderId) -> (OrderStatus, PaymentStatus) {
        let orders = self.orders.lock().await;
        let row = orders.get(&order_id).expect("order exists");
        (row.status, row.payment_status)
    }

    async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    async fn request_status(&self) -> TransactionStatus {
        self.requests.lock().await.first().expect("request recorded").status
    }
}

impl PaymentLedger for &MemoryLedger {
    async fn order_exists(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        Ok(self.orders.lock().await.contains_key(&order_id))
    }

    async fn record_request(&self, request: NewPaymentRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.lock().await;
        if requests
            .iter()
            .any(|r| r.checkout_request_id == request.checkout_request_id)
        {
            return Err(RepositoryError::Conflict("duplicate checkout id".to_string()));
        }
        requests.push(PaymentRequest {
            id: Uuid::new_v4(),
            order_id: request.order_id,
            merchant_request_id: request.merchant_request_id,
            checkout_request_id: request.checkout_request_id,
            phone: request.phone.to_string(),
            amount: request.amount,
            status: TransactionStatus::Pending,
            result_code: None,
            result_desc: None,
            created_at: Utc::now(),
            resolved_at: None,
        });
        Ok(())
    }

    async fn find_request(
        &self,
        checkout_request_id: &str,
        merchant_request_id: &str,
    ) -> Result<Option<PaymentRequest>, RepositoryError> {
        let requests = self.requests.lock().await;
        let found = requests
            .iter()
            .find(|r| r.checkout_request_id == checkout_request_id)
            .or_else(|| {
                requests
                    .iter()
                    .find(|r| r.merchant_request_id == merchant_request_id)
            });
        Ok(found.cloned())
    }

    async fn complete(&self, settlement: Settlement) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.lock().await;
        let mut orders = self.orders.lock().await;
        let mut entries = self.entries.lock().await;

        match settlement.request_id {
            Some(id) => {
                let Some(request) = requests
                    .iter_mut()
                    .find(|r| r.id == id && r.status == TransactionStatus::Pending)
                else {
                    return Ok(false);
                };
                request.status = TransactionStatus::Completed;
                request.result_code = Some(0);
                request.resolved_at = Some(Utc::now());
            }
            None => {
                let seen = entries.iter().any(|e| {
                    e.metadata["merchant_request_id"] == settlement.merchant_request_id.as_str()
                });
                if seen {
                    return Ok(false);
                }
            }
        }

        let order = orders
            .get_mut(&settlement.order_id)
            .ok_or(RepositoryError::NotFound)?;
        order.payment_status = PaymentStatus::Completed;
        if order.status == OrderStatus::Pending {
            order.status = OrderStatus::Confirmed;
        }

        entries.push(LedgerEntry {
            order_id: settlement.order_id,
            amount: settlement.amount.unwrap_or(order.total),
            reference: settlement.receipt,
            metadata: settlement.metadata,
        });
        Ok(true)
    }

    async fn fail(
        &self,
        request_id: Uuid,
        result_code: i64,
        result_desc: &str,
    ) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.lock().await;
        let Some(request) = requests
            .iter_mut()
            .find(|r| r.id == request_id && r.status == TransactionStatus::Pending)
        else {
            return Ok(false);
        };
        request.status = TransactionStatus::Failed;
        request.result_code = i32::try_from(result_code).ok();
        request.result_desc = Some(result_desc.to_string());
        request.resolved_at = Some(Utc::now());
        Ok(true)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn initiate(order_id: OrderId, phone: &str, amount: Decimal) -> InitiatePayment {
    InitiatePayment {
        order_id,
        phone: phone.to_string(),
        amount,
    }
}

fn callback(merchant_request_id: &str, result_code: i64, amount: Option<i64>) -> StkCallback {
    let mut items = vec![
        json!({ "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" }),
        json!({ "Name": "TransactionDate", "Value": 20_191_219_102_115_u64 }),
        json!({ "Name": "PhoneNumber", "Value": 254_712_345_678_u64 }),
    ];
    if let Some(amount) = amount {
        items.push(json!({ "Name": "Amount", "Value": amount }));
    }

    let mut stk = json!({
        "MerchantRequestID": merchant_request_id,
        "CheckoutRequestID": "ws_CO_191220191020363925",
        "ResultCode": result_code,
        "ResultDesc": if result_code == 0 {
            "The service request is processed successfully."
        } else {
            "Request cancelled by user"
        },
    });
    if result_code == 0 {
        stk["CallbackMetadata"] = json!({ "Item": items });
    }

    let envelope: StkCallbackEnvelope =
        serde_json::from_value(json!({ "Body": { "stkCallback": stk } })).expect("valid callback");
    envelope.body.stk_callback
}

// ============================================================================
// Initiation
// ============================================================================

#[tokio::test]
async fn test_initiate_sends_push_and_records_request() {
    let gateway = ScriptedGateway::new(GatewayMode::Accept);
    let (ledger, order_id) = MemoryLedger::with_order(450).await;
    let service = PaymentService::new(&gateway, &ledger);

    let outcome = service
        .initiate(initiate(order_id, "0712 345 678", Decimal::new(44950, 2)))
        .await
        .expect("initiate");

    assert!(outcome.accepted);
    assert_eq!(outcome.message, PROMPT_SENT_MESSAGE);
    assert_eq!(
        outcome.checkout_request_id.as_deref(),
        Some("ws_CO_191220191020363925")
    );

    let pushes = gateway.pushes.lock().await;
    let push = pushes.first().expect("push sent");
    assert_eq!(push.phone.as_str(), "254712345678");
    // Cents round up to the next shilling
    assert_eq!(push.amount, 450);
    assert_eq!(push.account_reference, order_id.to_string());

    assert_eq!(ledger.request_status().await, TransactionStatus::Pending);
}

#[tokio::test]
async fn test_initiate_reports_gateway_rejection() {
    let gateway = ScriptedGateway::new(GatewayMode::Reject);
    let (ledger, order_id) = MemoryLedger::with_order(450).await;
    let service = PaymentService::new(&gateway, &ledger);

    let outcome = service
        .initiate(initiate(order_id, "0712345678", Decimal::from(450)))
        .await
        .expect("rejection is not an error");

    assert!(!outcome.accepted);
    assert_eq!(outcome.message, "Bad Request - Invalid PartyB");
    assert!(outcome.merchant_request_id.is_none());
    assert!(ledger.requests.lock().await.is_empty());
}

#[tokio::test]
async fn test_initiate_propagates_unreachable_gateway() {
    let gateway = ScriptedGateway::new(GatewayMode::Unreachable);
    let (ledger, order_id) = MemoryLedger::with_order(450).await;
    let service = PaymentService::new(&gateway, &ledger);

    let result = service
        .initiate(initiate(order_id, "0712345678", Decimal::from(450)))
        .await;

    assert!(matches!(result, Err(PaymentError::Gateway(_))));
}

#[tokio::test]
async fn test_initiate_rejects_invalid_phone_before_gateway() {
    let gateway = ScriptedGateway::new(GatewayMode::Accept);
    let (ledger, order_id) = MemoryLedger::with_order(450).await;
    let service = PaymentService::new(&gateway, &ledger);

    let result = service
        .initiate(initiate(order_id, "0201234567", Decimal::from(450)))
        .await;

    assert!(matches!(result, Err(PaymentError::InvalidPhone(_))));
    assert!(gateway.pushes.lock().await.is_empty());
}

#[tokio::test]
async fn test_initiate_rejects_non_positive_amount() {
    let gateway = ScriptedGateway::new(GatewayMode::Accept);
    let (ledger, order_id) = MemoryLedger::with_order(450).await;
    let service = PaymentService::new(&gateway, &ledger);

    let result = service
        .initiate(initiate(order_id, "0712345678", Decimal::ZERO))
        .await;

    assert!(matches!(result, Err(PaymentError::InvalidAmount)));
    assert!(gateway.pushes.lock().await.is_empty());
}

#[tokio::test]
async fn test_initiate_rejects_unknown_order() {
    let gateway = ScriptedGateway::new(GatewayMode::Accept);
    let ledger = MemoryLedger::default();
    let service = PaymentService::new(&gateway, &ledger);
    let missing = OrderId::new_v4();

    let result = service
        .initiate(initiate(missing, "0712345678", Decimal::from(450)))
        .await;

    assert!(matches!(result, Err(PaymentError::UnknownOrder(id)) if id == missing));
    assert!(gateway.pushes.lock().await.is_empty());
}

// ============================================================================
// Settlement
// ============================================================================

async fn initiated() -> (ScriptedGateway, MemoryLedger, OrderId) {
    let gateway = ScriptedGateway::new(GatewayMode::Accept);
    let (ledger, order_id) = MemoryLedger::with_order(450).await;
    PaymentService::new(&gateway, &ledger)
        .initiate(initiate(order_id, "0712345678", Decimal::from(450)))
        .await
        .expect("initiate");
    (gateway, ledger, order_id)
}

#[tokio::test]
async fn test_successful_callback_settles_order_once() {
    let (gateway, ledger, order_id) = initiated().await;
    let service = PaymentService::new(&gateway, &ledger);

    let outcome = service
        .settle(&callback("29115-34620561-1", 0, Some(450)))
        .await
        .expect("settle");

    assert_eq!(outcome, SettlementOutcome::Settled { order_id });
    assert_eq!(
        ledger.order(order_id).await,
        (OrderStatus::Confirmed, PaymentStatus::Completed)
    );
    assert_eq!(ledger.request_status().await, TransactionStatus::Completed);

    let entries = ledger.entries.lock().await;
    assert_eq!(entries.len(), 1);
    let entry = entries.first().expect("entry");
    assert_eq!(entry.order_id, order_id);
    assert_eq!(entry.amount, Decimal::from(450));
    assert_eq!(entry.reference.as_deref(), Some("NLJ7RT61SV"));
    assert_eq!(entry.metadata["receipt"], "NLJ7RT61SV");
}

#[tokio::test]
async fn test_redelivered_callback_is_duplicate() {
    let (gateway, ledger, order_id) = initiated().await;
    let service = PaymentService::new(&gateway, &ledger);
    let delivery = callback("29115-34620561-1", 0, Some(450));

    service.settle(&delivery).await.expect("first delivery");
    let second = service.settle(&delivery).await.expect("second delivery");

    assert_eq!(second, SettlementOutcome::Duplicate { order_id });
    assert_eq!(ledger.entry_count().await, 1);
}

#[tokio::test]
async fn test_settlement_falls_back_to_request_amount() {
    let (gateway, ledger, _) = initiated().await;
    let service = PaymentService::new(&gateway, &ledger);

    service
        .settle(&callback("29115-34620561-1", 0, None))
        .await
        .expect("settle");

    let entries = ledger.entries.lock().await;
    assert_eq!(entries.first().expect("entry").amount, Decimal::from(450));
}

#[tokio::test]
async fn test_failed_callback_leaves_order_unpaid() {
    let (gateway, ledger, order_id) = initiated().await;
    let service = PaymentService::new(&gateway, &ledger);

    let outcome = service
        .settle(&callback("29115-34620561-1", 1032, None))
        .await
        .expect("settle");

    assert_eq!(
        outcome,
        SettlementOutcome::Failed {
            order_id,
            result_code: 1032
        }
    );
    assert_eq!(
        ledger.order(order_id).await,
        (OrderStatus::Pending, PaymentStatus::Pending)
    );
    assert_eq!(ledger.request_status().await, TransactionStatus::Failed);
    assert_eq!(ledger.entry_count().await, 0);
}

#[tokio::test]
async fn test_success_after_failure_is_duplicate() {
    let (gateway, ledger, order_id) = initiated().await;
    let service = PaymentService::new(&gateway, &ledger);

    service
        .settle(&callback("29115-34620561-1", 1032, None))
        .await
        .expect("failure");
    let late = service
        .settle(&callback("29115-34620561-1", 0, Some(450)))
        .await
        .expect("late success");

    assert_eq!(late, SettlementOutcome::Duplicate { order_id });
    assert_eq!(ledger.entry_count().await, 0);
}

#[tokio::test]
async fn test_untracked_callback_keyed_by_order_id() {
    let gateway = ScriptedGateway::new(GatewayMode::Accept);
    let (ledger, order_id) = MemoryLedger::with_order(300).await;
    let service = PaymentService::new(&gateway, &ledger);

    let outcome = service
        .settle(&callback(&order_id.to_string(), 0, None))
        .await
        .expect("settle");

    assert_eq!(outcome, SettlementOutcome::Settled { order_id });
    let entries = ledger.entries.lock().await;
    // No recorded request and no metadata amount: the order total is charged
    assert_eq!(entries.first().expect("entry").amount, Decimal::from(300));
}

#[tokio::test]
async fn test_untracked_callback_applies_once() {
    let gateway = ScriptedGateway::new(GatewayMode::Accept);
    let (ledger, order_id) = MemoryLedger::with_order(300).await;
    let service = PaymentService::new(&gateway, &ledger);
    let delivery = callback(&order_id.to_string(), 0, Some(300));

    service.settle(&delivery).await.expect("first delivery");
    let second = service.settle(&delivery).await.expect("second delivery");

    assert_eq!(second, SettlementOutcome::Duplicate { order_id });
    assert_eq!(ledger.entry_count().await, 1);
}

#[tokio::test]
async fn test_unknown_callback_is_ignored() {
    let gateway = ScriptedGateway::new(GatewayMode::Accept);
    let (ledger, order_id) = MemoryLedger::with_order(300).await;
    let service = PaymentService::new(&gateway, &ledger);

    let outcome = service
        .settle(&callback("10000-99999999-1", 0, Some(300)))
        .await
        .expect("settle");

    assert_eq!(outcome, SettlementOutcome::Ignored);
    assert_eq!(
        ledger.order(order_id).await,
        (OrderStatus::Pending, PaymentStatus::Pending)
    );
}
