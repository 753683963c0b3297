//! Daraja OAuth: consumer key/secret to a short-lived bearer token.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::MpesaError;

/// Seconds shaved off a token's lifetime so it is never used at the edge.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Bearer token issued by `/oauth/v1/generate`.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Token sent as `Authorization: Bearer ...`.
    pub token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

impl AccessToken {
    /// Check if the token has expired (or is within the safety margin).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() >= self.expires_at - EXPIRY_MARGIN_SECS
    }
}

/// Daraja returns `expires_in` as a string (`"3599"`).
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

/// Fetch a fresh access token with HTTP basic auth.
///
/// # Errors
///
/// Returns `MpesaError::AuthenticationFailed` if the credentials are rejected
/// or the response is malformed, `MpesaError::Http` on transport failure.
#[instrument(skip(client, consumer_key, consumer_secret))]
pub async fn fetch_token(
    client: &reqwest::Client,
    base_url: &str,
    consumer_key: &SecretString,
    consumer_secret: &SecretString,
) -> Result<AccessToken, MpesaError> {
    let now = chrono::Utc::now().timestamp();
    let url = token_url(base_url)?;

    let response = client
        .get(url)
        .basic_auth(
            consumer_key.expose_secret(),
            Some(consumer_secret.expose_secret()),
        )
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<TokenErrorResponse>(&body)
            .ok()
            .and_then(|e| match (e.error_code, e.error_message) {
                (Some(code), Some(msg)) => Some(format!("{code}: {msg}")),
                (None, Some(msg)) => Some(msg),
                (Some(code), None) => Some(code),
                (None, None) => None,
            })
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(MpesaError::AuthenticationFailed(message));
    }

    let parsed: TokenResponse = serde_json::from_str(&body)?;
    let lifetime: i64 = parsed.expires_in.trim().parse().map_err(|_| {
        MpesaError::AuthenticationFailed(format!("invalid expires_in: {}", parsed.expires_in))
    })?;

    Ok(AccessToken {
        token: SecretString::from(parsed.access_token),
        expires_at: now + lifetime,
    })
}

fn token_url(base_url: &str) -> Result<Url, MpesaError> {
    let mut url = Url::parse(base_url)
        .and_then(|u| u.join("/oauth/v1/generate"))
        .map_err(|e| MpesaError::AuthenticationFailed(format!("invalid base URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("grant_type", "client_credentials");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_expired() {
        let now = chrono::Utc::now().timestamp();

        let expired = AccessToken {
            token: SecretString::from("t"),
            expires_at: now - 10,
        };
        assert!(expired.is_expired());

        let fresh = AccessToken {
            token: SecretString::from("t"),
            expires_at: now + 3599,
        };
        assert!(!fresh.is_expired());

        // Within the margin counts as expired
        let edge = AccessToken {
            token: SecretString::from("t"),
            expires_at: now + 30,
        };
        assert!(edge.is_expired());
    }

    #[test]
    fn test_token_url() {
        let url = token_url("https://sandbox.safaricom.co.ke").expect("url");
        assert_eq!(
            url.as_str(),
            "https://sandbox.safaricom.co.ke/oauth/v1/generate?grant_type=client_credentials"
        );
    }

    #[test]
    fn test_token_response_deserialization() {
        let body = r#"{"access_token":"c9SQxWWhmdVRlyh0zh8gZDTkubVF","expires_in":"3599"}"#;
        let parsed: TokenResponse = serde_json::from_str(body).expect("deserialize");
        assert_eq!(parsed.expires_in, "3599");
    }
}
