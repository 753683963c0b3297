//! Daraja HTTP client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};
use url::Url;

use soko_core::MsisdnKe;

use crate::config::MpesaConfig;

use super::MpesaError;
use super::auth::{self, AccessToken};
use super::types::{
    self, ApiErrorResponse, StkPushRequest, StkPushResponse, TRANSACTION_TYPE_PAYBILL,
};

const TOKEN_CACHE_KEY: &str = "daraja";
/// Daraja tokens live for an hour; never keep one longer than that.
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(3600);
/// Daraja rejects descriptions longer than this.
const MAX_DESCRIPTION_LEN: usize = 13;

/// An STK push to send.
#[derive(Debug, Clone)]
pub struct StkPush {
    /// Phone that receives the PIN prompt and pays.
    pub phone: MsisdnKe,
    /// Whole shillings, at least 1.
    pub amount: i64,
    /// Shown to the customer as the account number; we use the order id.
    pub account_reference: String,
    /// Short description shown on the prompt.
    pub description: String,
}

/// Something that can ask a customer's phone for payment.
///
/// [`MpesaClient`] is the production implementation; the payment service is
/// generic over this so it can be driven without the network.
pub trait PaymentGateway: Send + Sync {
    /// Send an STK push and return the gateway's acknowledgement.
    fn stk_push(
        &self,
        push: StkPush,
    ) -> impl Future<Output = Result<StkPushResponse, MpesaError>> + Send;
}

/// Daraja API client.
///
/// Cheap to clone; the HTTP connection pool and token cache are shared.
#[derive(Clone)]
pub struct MpesaClient {
    inner: Arc<MpesaClientInner>,
}

struct MpesaClientInner {
    client: reqwest::Client,
    config: MpesaConfig,
    tokens: Cache<&'static str, AccessToken>,
}

impl MpesaClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `MpesaError::Http` if the HTTP client cannot be built.
    pub fn new(config: &MpesaConfig) -> Result<Self, MpesaError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let tokens = Cache::builder()
            .max_capacity(1)
            .time_to_live(TOKEN_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(MpesaClientInner {
                client,
                config: config.clone(),
                tokens,
            }),
        })
    }

    /// The callback URL sent with each push, carrying the shared token if set.
    #[must_use]
    pub fn push_callback_url(&self) -> Url {
        let mut url = self.inner.config.callback_url.clone();
        if let Some(token) = &self.inner.config.callback_token {
            url.query_pairs_mut()
                .append_pair("token", token.expose_secret());
        }
        url
    }

    /// Get a bearer token, reusing the cached one while it is still valid.
    ///
    /// # Errors
    ///
    /// Returns an error if a new token has to be fetched and that fails.
    pub async fn access_token(&self) -> Result<SecretString, MpesaError> {
        if let Some(cached) = self.inner.tokens.get(TOKEN_CACHE_KEY).await
            && !cached.is_expired()
        {
            debug!("Using cached Daraja token");
            return Ok(cached.token);
        }

        let config = &self.inner.config;
        let fresh = auth::fetch_token(
            &self.inner.client,
            &config.base_url,
            &config.consumer_key,
            &config.consumer_secret,
        )
        .await?;

        let token = fresh.token.clone();
        self.inner.tokens.insert(TOKEN_CACHE_KEY, fresh).await;
        Ok(token)
    }

    fn endpoint(&self, path: &str) -> Result<Url, MpesaError> {
        Url::parse(&self.inner.config.base_url)
            .and_then(|u| u.join(path))
            .map_err(|e| MpesaError::Api {
                code: "config".to_string(),
                message: format!("invalid base URL: {e}"),
            })
    }

    fn build_push_request(&self, push: StkPush) -> StkPushRequest {
        let config = &self.inner.config;
        let timestamp = types::timestamp(chrono::Utc::now());
        let password = types::password(
            &config.shortcode,
            config.passkey.expose_secret(),
            &timestamp,
        );
        let description: String = push.description.chars().take(MAX_DESCRIPTION_LEN).collect();

        StkPushRequest {
            business_short_code: config.shortcode.clone(),
            password,
            timestamp,
            transaction_type: TRANSACTION_TYPE_PAYBILL,
            amount: push.amount.max(1),
            party_a: push.phone.as_u64(),
            party_b: config.shortcode.clone(),
            phone_number: push.phone.as_u64(),
            callback_url: self.push_callback_url().to_string(),
            account_reference: push.account_reference,
            transaction_desc: description,
        }
    }

    /// Handle an error status code.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> MpesaError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return MpesaError::RateLimited(retry_after);
        }

        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => MpesaError::Api {
                    code: api_error.error_code,
                    message: api_error.error_message,
                },
                Err(_) => MpesaError::Api {
                    code: status.as_u16().to_string(),
                    message: body,
                },
            },
            Err(e) => MpesaError::Http(e),
        }
    }
}

impl PaymentGateway for MpesaClient {
    #[instrument(skip(self, push), fields(phone = %push.phone.masked(), amount = push.amount))]
    async fn stk_push(&self, push: StkPush) -> Result<StkPushResponse, MpesaError> {
        let token = self.access_token().await?;
        let url = self.endpoint("/mpesa/stkpush/v1/processrequest")?;
        let request = self.build_push_request(push);

        let response = self
            .inner
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.inner.tokens.invalidate(TOKEN_CACHE_KEY).await;
            }
            return Err(Self::handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: StkPushResponse = serde_json::from_str(&body)?;

        if !parsed.is_accepted() {
            return Err(MpesaError::Api {
                code: parsed.response_code,
                message: parsed.response_description,
            });
        }

        debug!(checkout_request_id = %parsed.checkout_request_id, "STK push accepted");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MpesaEnvironment;

    fn config(token: Option<&str>) -> MpesaConfig {
        MpesaConfig {
            environment: MpesaEnvironment::Sandbox,
            base_url: "https://sandbox.safaricom.co.ke".to_string(),
            consumer_key: SecretString::from("key"),
            consumer_secret: SecretString::from("secret"),
            shortcode: "174379".to_string(),
            passkey: SecretString::from("passkey"),
            callback_url: Url::parse("https://soko.example/api/mpesa/callback").expect("url"),
            callback_token: token.map(SecretString::from),
            timeout: Duration::from_secs(5),
        }
    }

    fn push(amount: i64) -> StkPush {
        StkPush {
            phone: MsisdnKe::parse("0712345678").expect("phone"),
            amount,
            account_reference: "order-1".to_string(),
            description: "Soko order payment".to_string(),
        }
    }

    #[test]
    fn test_push_callback_url_carries_token() {
        let client = MpesaClient::new(&config(Some("tok3n"))).expect("client");
        assert_eq!(
            client.push_callback_url().as_str(),
            "https://soko.example/api/mpesa/callback?token=tok3n"
        );

        let client = MpesaClient::new(&config(None)).expect("client");
        assert_eq!(
            client.push_callback_url().as_str(),
            "https://soko.example/api/mpesa/callback"
        );
    }

    #[test]
    fn test_build_push_request() {
        let client = MpesaClient::new(&config(None)).expect("client");
        let request = client.build_push_request(push(450));

        assert_eq!(request.business_short_code, "174379");
        assert_eq!(request.party_b, "174379");
        assert_eq!(request.party_a, 254_712_345_678);
        assert_eq!(request.phone_number, 254_712_345_678);
        assert_eq!(request.amount, 450);
        assert_eq!(request.timestamp.len(), 14);
        assert_eq!(
            request.password,
            types::password("174379", "passkey", &request.timestamp)
        );
        assert!(request.transaction_desc.len() <= MAX_DESCRIPTION_LEN);
    }

    #[test]
    fn test_build_push_request_minimum_amount() {
        let client = MpesaClient::new(&config(None)).expect("client");
        assert_eq!(client.build_push_request(push(0)).amount, 1);
    }
}
