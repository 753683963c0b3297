//! Daraja wire types.
//!
//! Field names are Daraja's (PascalCase, with a few all-caps `ID`/`URL`
//! suffixes renamed explicitly).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Daraja timestamps are East Africa Time (UTC+3), no DST.
const EAT_OFFSET_HOURS: i64 = 3;

/// Only Paybill STK pushes are supported.
pub const TRANSACTION_TYPE_PAYBILL: &str = "CustomerPayBillOnline";

/// `ResponseCode` for an accepted push.
pub const RESPONSE_CODE_ACCEPTED: &str = "0";

/// Format an instant as a Daraja timestamp: `YYYYMMDDHHMMSS` in EAT.
#[must_use]
pub fn timestamp(at: DateTime<Utc>) -> String {
    (at + TimeDelta::hours(EAT_OFFSET_HOURS))
        .format("%Y%m%d%H%M%S")
        .to_string()
}

/// The STK password: `base64(shortcode + passkey + timestamp)`.
#[must_use]
pub fn password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// Body of `POST /mpesa/stkpush/v1/processrequest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushRequest {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: &'static str,
    pub amount: i64,
    pub party_a: u64,
    pub party_b: String,
    pub phone_number: u64,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

/// Synchronous answer to an STK push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    pub response_code: String,
    pub response_description: String,
    #[serde(default)]
    pub customer_message: String,
}

impl StkPushResponse {
    /// Whether the prompt was delivered to the handset.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.response_code == RESPONSE_CODE_ACCEPTED
    }
}

/// Error body Daraja returns with 4xx/5xx statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(rename = "requestId", default)]
    pub request_id: Option<String>,
    #[serde(rename = "errorCode")]
    pub error_code: String,
    #[serde(rename = "errorMessage")]
    pub error_message: String,
}

/// Outer wrapper of the callback POST: `{"Body":{"stkCallback":{...}}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

/// Outcome of an STK push.
///
/// `ResultCode` 0 is a successful payment; anything else (1032 cancelled by
/// user, 1037 timeout, 2001 wrong PIN, ...) is a failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: String,
    #[serde(deserialize_with = "int_or_string")]
    pub result_code: i64,
    #[serde(default)]
    pub result_desc: String,
    /// Present only on success.
    #[serde(default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

impl StkCallback {
    /// Whether the customer paid.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result_code == 0
    }

    /// Look up a metadata item by name.
    #[must_use]
    pub fn metadata(&self, name: &str) -> Option<&serde_json::Value> {
        self.callback_metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == name)?
            .value
            .as_ref()
    }

    /// `Amount` actually paid.
    #[must_use]
    pub fn amount(&self) -> Option<Decimal> {
        self.metadata("Amount").and_then(json_decimal)
    }

    /// `MpesaReceiptNumber` (e.g. `NLJ7RT61SV`).
    #[must_use]
    pub fn receipt_number(&self) -> Option<String> {
        self.metadata("MpesaReceiptNumber").map(json_text)
    }

    /// `PhoneNumber` that paid.
    #[must_use]
    pub fn phone_number(&self) -> Option<String> {
        self.metadata("PhoneNumber").map(json_text)
    }

    /// `TransactionDate` as sent (`YYYYMMDDHHMMSS`).
    #[must_use]
    pub fn transaction_date(&self) -> Option<String> {
        self.metadata("TransactionDate").map(json_text)
    }
}

/// `CallbackMetadata.Item` list.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<MetadataItem>,
}

/// A single name/value pair. Some items (`Balance`) arrive without a value.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<serde_json::Value>,
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_decimal(value: &serde_json::Value) -> Option<Decimal> {
    json_text(value).parse().ok()
}

fn int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Int(i64),
        Text(String),
    }

    match Code::deserialize(deserializer)? {
        Code::Int(n) => Ok(n),
        Code::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
