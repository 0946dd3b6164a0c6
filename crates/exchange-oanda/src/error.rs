//! Error types for the OANDA v20 integration.

use sentiment_trader_core::TradeError;
use thiserror::Error;

/// Errors that can occur when talking to OANDA.
#[derive(Debug, Error)]
pub enum OandaError {
    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// `errorMessage` from the response body, or the raw body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Order was cancelled or rejected by the broker.
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Invalid account or trade identifier.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl OandaError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Returns true if the error is a transport-level or server-side failure.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Converts into the engine's taxonomy for `operation`.
    pub fn into_trade_error(self, operation: &str) -> TradeError {
        match self {
            Self::Configuration(message) => TradeError::Configuration(message),
            other => TradeError::unavailable(operation, other.to_string()),
        }
    }
}

impl From<reqwest::Error> for OandaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OandaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for OANDA operations.
pub type Result<T> = std::result::Result<T, OandaError>;
