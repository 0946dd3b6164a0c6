//! Error types for sentiment lookups.

use sentiment_trader_core::TradeError;
use thiserror::Error;

/// Errors raised by a sentiment backend.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The request exceeded its deadline.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Connection or transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Body could not be read as a ratio.
    #[error("unparseable response: {0}")]
    Parse(String),

    /// Symbol key is not safe to place in a query.
    #[error("invalid symbol key: {0:?}")]
    InvalidSymbol(String),

    /// Missing or invalid backend settings.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SourceError {
    /// Creates an HTTP status error, keeping at most 200 bytes of body.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > 200 {
            let mut cut = 200;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Self::Http { status, body }
    }

    /// Converts into the engine's taxonomy for a lookup of `symbol`.
    ///
    /// Only a timeout is a collaborator outage; every other failure means the
    /// cycle has no usable signal.
    pub fn into_trade_error(self, symbol: &str) -> TradeError {
        match self {
            Self::Timeout(message) => TradeError::unavailable("fetch_sentiment", message),
            Self::InvalidSymbol(key) => TradeError::MalformedSymbol(key),
            Self::Configuration(message) => TradeError::Configuration(message),
            other => TradeError::signal_unavailable(symbol, other.to_string()),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
