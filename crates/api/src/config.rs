//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SOKO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SOKO_PUBLIC_URL` - Public URL of this server, used to build the M-Pesa callback URL
//!
//! ## Optional
//! - `SOKO_HOST` - Bind address (default: 127.0.0.1)
//! - `SOKO_PORT` - Listen port (default: 8080)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for human-readable
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//!
//! ## Optional (M-Pesa - enables STK push payments)
//! - `MPESA_CONSUMER_KEY` - Daraja app consumer key
//! - `MPESA_CONSUMER_SECRET` - Daraja app consumer secret
//! - `MPESA_SHORTCODE` - Paybill/till business short code
//! - `MPESA_PASSKEY` - Lipa na M-Pesa online passkey
//! - `MPESA_ENV` - `sandbox` (default) or `production`
//! - `MPESA_CALLBACK_TOKEN` - Shared token appended to the callback URL and checked on delivery
//! - `MPESA_TIMEOUT_SECS` - Gateway request timeout (default: 30)
//!
//! ## Optional (Assistant - enables the chat relay)
//! - `LLM_API_KEY` - API key for the chat-completions endpoint
//! - `LLM_API_URL` - Chat-completions URL (default: `OpenAI`)
//! - `LLM_MODEL` - Model identifier (default: gpt-4o-mini)
//!
//! ## Optional (Web push / app shell)
//! - `VAPID_PUBLIC_KEY` - Public key handed to browsers for push subscriptions
//! - `SHELL_ORIGIN` - Origin serving the web app's static assets
//! - `SHELL_VERSION` - App shell cache version (default: 1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MPESA_TIMEOUT_SECS: u64 = 30;
const MPESA_SANDBOX_URL: &str = "https://sandbox.safaricom.co.ke";
const MPESA_PRODUCTION_URL: &str = "https://api.safaricom.co.ke";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines for local development.
    #[default]
    Pretty,
    /// One JSON object per event for log aggregation.
    Json,
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for this server
    pub public_url: Url,
    /// M-Pesa Daraja configuration (payments disabled when absent)
    pub mpesa: Option<MpesaConfig>,
    /// Chat assistant configuration (assistant disabled when absent)
    pub assistant: Option<AssistantConfig>,
    /// VAPID public key for browser push subscriptions
    pub vapid_public_key: Option<String>,
    /// App shell cache configuration (shell route disabled when absent)
    pub shell: Option<ShellConfig>,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Which Daraja deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MpesaEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl MpesaEnvironment {
    /// Base URL of the Daraja API for this environment.
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => MPESA_SANDBOX_URL,
            Self::Production => MPESA_PRODUCTION_URL,
        }
    }
}

/// M-Pesa Daraja API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct MpesaConfig {
    /// Sandbox or production
    pub environment: MpesaEnvironment,
    /// Daraja API base URL (derived from the environment, overridable in tests)
    pub base_url: String,
    /// App consumer key
    pub consumer_key: SecretString,
    /// App consumer secret
    pub consumer_secret: SecretString,
    /// Paybill or till number
    pub shortcode: String,
    /// Lipa na M-Pesa online passkey
    pub passkey: SecretString,
    /// Fully-qualified callback URL sent with every STK push
    pub callback_url: Url,
    /// Shared token the callback must present, if configured
    pub callback_token: Option<SecretString>,
    /// Request timeout for gateway calls
    pub timeout: Duration,
}

impl std::fmt::Debug for MpesaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpesaConfig")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("consumer_key", &"[REDACTED]")
            .field("consumer_secret", &"[REDACTED]")
            .field("shortcode", &self.shortcode)
            .field("passkey", &"[REDACTED]")
            .field("callback_url", &self.callback_url.path())
            .field(
                "callback_token",
                &self.callback_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Chat-completions relay configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct AssistantConfig {
    /// Chat-completions endpoint (`OpenAI`-compatible)
    pub api_url: String,
    /// Bearer API key
    pub api_key: SecretString,
    /// Model identifier
    pub model: String,
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// App shell cache configuration.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Origin the static assets are fetched from on a cache miss
    pub origin: Url,
    /// Cache version; bumping it discards previously cached assets
    pub version: u32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SOKO_DATABASE_URL")?;
        let host = get_env_or_default("SOKO_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SOKO_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SOKO_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SOKO_PORT".to_string(), e.to_string()))?;
        let public_url = parse_url("SOKO_PUBLIC_URL", &get_required_env("SOKO_PUBLIC_URL")?)?;

        let mpesa = MpesaConfig::from_env(&public_url)?;
        if mpesa.is_none() {
            tracing::warn!("M-Pesa not configured, payment routes will return 503");
        }
        let assistant = AssistantConfig::from_env()?;
        let shell = ShellConfig::from_env()?;

        let log_format = match get_optional_env("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            database_url,
            host,
            port,
            public_url,
            mpesa,
            assistant,
            vapid_public_key: get_optional_env("VAPID_PUBLIC_KEY"),
            shell,
            log_format,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MpesaConfig {
    /// Load M-Pesa configuration from environment.
    ///
    /// Returns `None` if the consumer key is not set (payments disabled).
    /// Once the key is present the remaining credentials are required.
    fn from_env(public_url: &Url) -> Result<Option<Self>, ConfigError> {
        let Some(consumer_key) = get_optional_env("MPESA_CONSUMER_KEY") else {
            return Ok(None);
        };
        let consumer_secret = get_required_env("MPESA_CONSUMER_SECRET")?;
        let passkey = get_required_env("MPESA_PASSKEY")?;
        let shortcode = get_required_env("MPESA_SHORTCODE")?;

        if !shortcode.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidEnvVar(
                "MPESA_SHORTCODE".to_string(),
                "must be numeric".to_string(),
            ));
        }

        // Sandbox credentials are public, so weak values only warn.
        for (key, value) in [
            ("MPESA_CONSUMER_SECRET", &consumer_secret),
            ("MPESA_PASSKEY", &passkey),
        ] {
            if let Err(e) = validate_secret_strength(value, key) {
                tracing::warn!("{key} validation warning: {e}");
            }
        }

        let environment = match get_env_or_default("MPESA_ENV", "sandbox").as_str() {
            "sandbox" => MpesaEnvironment::Sandbox,
            "production" => MpesaEnvironment::Production,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "MPESA_ENV".to_string(),
                    format!("expected sandbox or production, got {other}"),
                ));
            }
        };

        let callback_token = get_optional_env("MPESA_CALLBACK_TOKEN")
            .map(|token| {
                validate_secret_strength(&token, "MPESA_CALLBACK_TOKEN")?;
                Ok(SecretString::from(token))
            })
            .transpose()?;

        let timeout_secs = get_env_or_default(
            "MPESA_TIMEOUT_SECS",
            &DEFAULT_MPESA_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar("MPESA_TIMEOUT_SECS".to_string(), e.to_string()))?;

        Ok(Some(Self {
            environment,
            base_url: environment.base_url().to_string(),
            consumer_key: SecretString::from(consumer_key),
            consumer_secret: SecretString::from(consumer_secret),
            shortcode,
            passkey: SecretString::from(passkey),
            callback_url: callback_url(public_url)?,
            callback_token,
            timeout: Duration::from_secs(timeout_secs),
        }))
    }
}

impl AssistantConfig {
    /// Returns `None` if `LLM_API_KEY` is not set (assistant disabled).
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = get_optional_env("LLM_API_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(&api_key, "LLM_API_KEY")?;

        Ok(Some(Self {
            api_url: get_env_or_default("LLM_API_URL", DEFAULT_LLM_API_URL),
            api_key: SecretString::from(api_key),
            model: get_env_or_default("LLM_MODEL", DEFAULT_LLM_MODEL),
        }))
    }
}

impl ShellConfig {
    /// Returns `None` if `SHELL_ORIGIN` is not set (shell route disabled).
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(origin) = get_optional_env("SHELL_ORIGIN") else {
            return Ok(None);
        };
        let version = get_env_or_default("SHELL_VERSION", "1")
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHELL_VERSION".to_string(), e.to_string()))?;

        Ok(Some(Self {
            origin: parse_url("SHELL_ORIGIN", &origin)?,
            version,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Build the callback URL the gateway posts STK results to.
fn callback_url(public_url: &Url) -> Result<Url, ConfigError> {
    public_url
        .join("/api/mpesa/callback")
        .map_err(|e| ConfigError::InvalidEnvVar("SOKO_PUBLIC_URL".to_string(), e.to_string()))
}

/// Parse a URL-valued variable.
fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
