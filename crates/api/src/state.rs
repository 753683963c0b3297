//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::assistant::{AssistantClient, AssistantError};
use crate::config::ApiConfig;
use crate::error::AppError;
use crate::mpesa::{MpesaClient, MpesaError};
use crate::realtime::EventHub;
use crate::shell::{self, ShellCache, UpstreamAssets};

/// Error building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("M-Pesa client: {0}")]
    Mpesa(#[from] MpesaError),
    #[error("assistant client: {0}")]
    Assistant(#[from] AssistantError),
    #[error("HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Integrations that are not configured are
/// `None`; their routes answer 503.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    mpesa: Option<MpesaClient>,
    assistant: Option<AssistantClient>,
    events: EventHub,
    shell: Option<(ShellCache, UpstreamAssets)>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the HTTP clients cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool, events: EventHub) -> Result<Self, StateError> {
        let mpesa = config.mpesa.as_ref().map(MpesaClient::new).transpose()?;
        let assistant = config
            .assistant
            .as_ref()
            .map(AssistantClient::new)
            .transpose()?;
        let shell = match &config.shell {
            Some(shell) => Some((
                ShellCache::new(shell.version),
                UpstreamAssets::new(reqwest::Client::builder().build()?, shell.origin.clone()),
            )),
            None => None,
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                mpesa,
                assistant,
                events,
                shell,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the M-Pesa client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ServiceUnavailable` if M-Pesa is not configured.
    pub fn mpesa(&self) -> Result<&MpesaClient, AppError> {
        self.inner
            .mpesa
            .as_ref()
            .ok_or_else(|| AppError::ServiceUnavailable("M-Pesa is not configured".to_string()))
    }

    /// Get the assistant client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ServiceUnavailable` if the assistant is not configured.
    pub fn assistant(&self) -> Result<&AssistantClient, AppError> {
        self.inner.assistant.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("Assistant is not configured".to_string())
        })
    }

    /// Get the change-feed hub.
    #[must_use]
    pub fn events(&self) -> &EventHub {
        &self.inner.events
    }

    /// Get the app-shell cache and its origin.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ServiceUnavailable` if no shell origin is configured.
    pub fn shell(&self) -> Result<(&ShellCache, &UpstreamAssets), AppError> {
        self.inner
            .shell
            .as_ref()
            .map(|(cache, source)| (cache, source))
            .ok_or_else(|| AppError::ServiceUnavailable("App shell is not configured".to_string()))
    }

    /// Pre-cache the app shell in the background, if one is configured.
    pub fn start_shell_install(&self) {
        if let Some((cache, source)) = &self.inner.shell {
            shell::install_async(cache.clone(), source.clone());
        }
    }
}
