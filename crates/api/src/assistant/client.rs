//! Chat-completions client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::AssistantConfig;

use super::error::{ApiErrorResponse, AssistantError};
use super::types::{ChatRequest, ChatResponse, Message};

const DEFAULT_MAX_TOKENS: u32 = 512;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed instructions sent ahead of every customer question.
pub const SYSTEM_PROMPT: &str = "You are Soko's shopping assistant. Soko is a Kenyan \
marketplace where customers buy products from local sellers, order food from \
restaurants, book boda and car rides, send errands and browse property listings. \
Payments are made with M-Pesa. Answer briefly and helpfully, in the language the \
customer writes in (English or Swahili). Quote prices in Kenyan shillings (KES). \
If you do not know something about a specific order or listing, say so and suggest \
where in the app to look.";

/// `OpenAI`-compatible chat-completions client.
#[derive(Clone)]
pub struct AssistantClient {
    inner: Arc<AssistantClientInner>,
}

struct AssistantClientInner {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

impl AssistantClient {
    /// Create a new assistant client.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::Unauthorized` if the API key is not a valid
    /// header value, `AssistantError::Http` if the HTTP client cannot be built.
    pub fn new(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let mut bearer = HeaderValue::from_str(&format!(
            "Bearer {}",
            config.api_key.expose_secret()
        ))
        .map_err(|_| AssistantError::Unauthorized("API key is not a valid header".to_string()))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(AssistantClientInner {
                client,
                api_url: config.api_url.clone(),
                model: config.model.clone(),
            }),
        })
    }

    /// Build the request body for a customer question.
    fn request_for(&self, user_text: &str) -> ChatRequest {
        ChatRequest {
            model: self.inner.model.clone(),
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(user_text)],
            max_tokens: Some(DEFAULT_MAX_TOKENS),
        }
    }

    /// Ask the assistant a question and return its answer verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the provider returns an error
    /// status, or the completion carries no text.
    #[instrument(skip(self, user_text), fields(model = %self.inner.model, chars = user_text.len()))]
    pub async fn reply(&self, user_text: &str) -> Result<String, AssistantError> {
        let response = self
            .inner
            .client
            .post(&self.inner.api_url)
            .json(&self.request_for(user_text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AssistantError::Parse(format!("Failed to parse response: {e}")))?;

        parsed
            .into_reply()
            .filter(|text| !text.trim().is_empty())
            .ok_or(AssistantError::EmptyResponse)
    }

    /// Handle an error status code.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> AssistantError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return AssistantError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return AssistantError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => AssistantError::Api {
                    error_type: api_error
                        .error
                        .error_type
                        .unwrap_or_else(|| status.as_u16().to_string()),
                    message: api_error.error.message,
                },
                Err(_) => AssistantError::Api {
                    error_type: "unknown".to_string(),
                    message: body,
                },
            },
            Err(e) => AssistantError::Http(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::assistant::types::Role;

    fn config() -> AssistantConfig {
        AssistantConfig {
            api_url: "https://llm.example/v1/chat/completions".to_string(),
            api_key: SecretString::from("sk-test"),
            model: "gpt-4o-mini".to_string(),
        }
    }

    #[test]
    fn test_request_carries_system_prompt_first() {
        let client = AssistantClient::new(&config()).expect("client");
        let request = client.request_for("Je, mnauza viatu?");

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, SYSTEM_PROMPT);
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.messages[1].content, "Je, mnauza viatu?");
    }

    #[test]
    fn test_rejects_unprintable_key() {
        let mut bad = config();
        bad.api_key = SecretString::from("sk\ntest");
        assert!(matches!(
            AssistantClient::new(&bad),
            Err(AssistantError::Unauthorized(_))
        ));
    }
}
