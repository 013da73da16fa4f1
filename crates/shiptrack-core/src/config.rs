//! Configuration types for the tracking system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ship24 API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.ship24.com/public/v1";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Tracking API configuration
    pub api: ApiConfig,

    /// Tracked store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Coordinator settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Webhook receiver settings (push updates disabled when absent)
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,

    /// Tracking numbers to ensure are tracked at startup
    #[serde(default)]
    pub tracking_numbers: Vec<String>,
}

impl TrackerConfig {
    /// Create a configuration with defaults for everything but the API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api: ApiConfig::new(api_key),
            store: StoreConfig::default(),
            coordinator: CoordinatorConfig::default(),
            webhook: None,
            tracking_numbers: Vec::new(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.api.validate()?;
        self.store.validate()?;
        self.coordinator.validate()?;

        if let Some(webhook) = &self.webhook {
            webhook.validate()?;
        }

        if self.tracking_numbers.iter().any(|n| n.trim().is_empty()) {
            return Err(crate::Error::config("Tracking numbers cannot be empty"));
        }

        Ok(())
    }

    /// Poll interval, taking webhook availability into account
    ///
    /// With a webhook configured, polling is only a fallback and runs on the
    /// shorter `webhook_update_interval_secs`.
    pub fn update_interval(&self) -> Duration {
        let secs = if self.webhook.is_some() {
            self.coordinator.webhook_update_interval_secs
        } else {
            self.coordinator.update_interval_secs
        };
        Duration::from_secs(secs)
    }
}

/// Tracking API configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Ship24 API key
    pub api_key: String,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Create an API configuration with the default base URL and timeout
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Override the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validate the API configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_key.trim().is_empty() {
            return Err(crate::Error::config("API key cannot be empty"));
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "API base URL must use http or https: {}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("API timeout must be > 0"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Keeps the API key out of logs
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Tracked store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// JSON file store
    File {
        /// Path to the store file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.is_empty() => {
                Err(crate::Error::config("Store file path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Poll interval without a webhook (in seconds)
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Fallback poll interval when a webhook is configured (in seconds)
    #[serde(default = "default_webhook_update_interval_secs")]
    pub webhook_update_interval_secs: u64,

    /// Capacity of the coordinator event channel
    ///
    /// When full, new events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Capacity of the webhook inbox
    ///
    /// When full, incoming webhook payloads are rejected.
    #[serde(default = "default_webhook_queue_capacity")]
    pub webhook_queue_capacity: usize,
}

impl CoordinatorConfig {
    /// Validate the coordinator configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.update_interval_secs == 0 || self.webhook_update_interval_secs == 0 {
            return Err(crate::Error::config("Update intervals must be > 0"));
        }
        if self.event_channel_capacity == 0 || self.webhook_queue_capacity == 0 {
            return Err(crate::Error::config("Channel capacities must be > 0"));
        }
        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval_secs(),
            webhook_update_interval_secs: default_webhook_update_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            webhook_queue_capacity: default_webhook_queue_capacity(),
        }
    }
}

/// Webhook receiver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Secret path segment identifying this receiver
    pub webhook_id: String,
}

impl WebhookConfig {
    /// Validate the webhook configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.webhook_id.is_empty() {
            return Err(crate::Error::config("Webhook ID cannot be empty"));
        }
        if !self
            .webhook_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(crate::Error::config(
                "Webhook ID may only contain ASCII letters, digits, '-' and '_'",
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_update_interval_secs() -> u64 {
    4 * 60 * 60
}

fn default_webhook_update_interval_secs() -> u64 {
    60 * 60
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_webhook_queue_capacity() -> usize {
    64
}
