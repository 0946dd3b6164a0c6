//! Error taxonomy for a decision cycle.
//!
//! Every variant is terminal for the current cycle. Nothing here is retried
//! in-process; a scheduler that re-runs the cycle owns any retry policy.

use thiserror::Error;

/// Errors raised while deciding on or converging a position.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    /// The sentiment source returned no data or the lookup failed.
    #[error("signal unavailable for {symbol}: {reason}")]
    SignalUnavailable {
        /// Source lookup key that was queried.
        symbol: String,
        /// Why no value could be produced.
        reason: String,
    },

    /// The source returned a value indistinguishable from "no data".
    #[error("invalid signal: ratio {ratio} carries no usable sentiment")]
    InvalidSignal {
        /// The rejected ratio.
        ratio: f64,
    },

    /// A broker-format instrument cannot be derived from the input.
    #[error("malformed symbol: {0:?}")]
    MalformedSymbol(String),

    /// A collaborator call timed out or failed at the transport level.
    #[error("{operation} unavailable: {message}")]
    CollaboratorUnavailable {
        /// The collaborator operation that failed (e.g. "open_position").
        operation: String,
        /// Transport or API message.
        message: String,
    },

    /// At least one trade in a close request stayed open.
    #[error(
        "close failed for {} of {} trades: {}; closed: {}",
        failed.len(),
        failed.len() + closed.len(),
        describe_failures(failed),
        describe_closed(closed)
    )]
    PartialCloseFailure {
        /// Trade ids that closed successfully.
        closed: Vec<String>,
        /// Trade ids that failed, with the broker's reason.
        failed: Vec<(String, String)>,
    },

    /// Invalid runtime parameters (threshold, order size, credentials).
    #[error("configuration error: {0}")]
    Configuration(String),
}

fn describe_failures(failed: &[(String, String)]) -> String {
    failed
        .iter()
        .map(|(id, reason)| format!("{id} ({reason})"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_closed(closed: &[String]) -> String {
    if closed.is_empty() {
        "none".to_string()
    } else {
        closed.join(", ")
    }
}

impl TradeError {
    /// Creates a signal-unavailable error.
    pub fn signal_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SignalUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Creates a collaborator-unavailable error.
    pub fn unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the sentiment reading itself.
    ///
    /// These abort the cycle before any broker action and map to exit code 1.
    #[must_use]
    pub fn is_signal_error(&self) -> bool {
        matches!(
            self,
            Self::SignalUnavailable { .. } | Self::InvalidSignal { .. }
        )
    }

    /// Returns true if re-running the cycle later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SignalUnavailable { .. }
                | Self::CollaboratorUnavailable { .. }
                | Self::PartialCloseFailure { .. }
        )
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, TradeError>;
