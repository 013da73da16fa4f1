//! Error types for the tracking system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for tracking operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the tracking system
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing API key
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Tracking number unknown to the carrier or the API
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure (DNS, connect, reset, 5xx)
    #[error("Network error: {0}")]
    Network(String),

    /// Request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Response or webhook body did not match the expected schema
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Tracked store errors
    #[error("Tracked store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend-specific error
    #[error("Backend error ({backend}): {message}")]
    Backend {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of a failure, recorded in package state
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Credentials rejected; fatal to configuration
    Auth,
    /// Tracking number unknown; degraded but non-fatal
    NotFound,
    /// Network, timeout, rate limit or server error; retried next cycle
    Transient,
    /// The remote side answered with something we could not map
    Malformed,
    /// Anything else
    Other,
}

impl Error {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a malformed payload error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }

    /// Create a tracked store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a backend-specific error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Classify this error for package state and retry decisions
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Authentication(_) => FailureKind::Auth,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited(_) | Self::Backend { .. } => {
                FailureKind::Transient
            }
            Self::MalformedPayload(_) | Self::Json(_) => FailureKind::Malformed,
            _ => FailureKind::Other,
        }
    }

    /// Whether the next poll cycle may succeed without intervention
    pub fn is_transient(&self) -> bool {
        self.failure_kind() == FailureKind::Transient
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
