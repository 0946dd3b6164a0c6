use crate::error::Result;
use crate::position::PositionSnapshot;
use crate::signal::Direction;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Supplies one scalar sentiment ratio per symbol and timeframe.
#[async_trait]
pub trait SentimentSource: Send + Sync {
    /// Returns `Ok(None)` when the source has no data for the window.
    async fn fetch(&self, symbol_key: &str, timeframe_minutes: u32) -> Result<Option<f64>>;

    fn name(&self) -> &str;
}

/// Result of closing one trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseOutcome {
    pub trade_id: String,
    pub status: CloseStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CloseStatus {
    Closed { realized_pl: Decimal },
    Failed { reason: String },
}

impl CloseOutcome {
    #[must_use]
    pub fn closed(trade_id: impl Into<String>, realized_pl: Decimal) -> Self {
        Self {
            trade_id: trade_id.into(),
            status: CloseStatus::Closed { realized_pl },
        }
    }

    #[must_use]
    pub fn failed(trade_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            trade_id: trade_id.into(),
            status: CloseStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.status, CloseStatus::Closed { .. })
    }
}

/// Broker acknowledgement of a filled market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Broker transaction or order id.
    pub order_id: String,
    /// Trade opened by the fill, if the broker reports one.
    pub trade_id: Option<String>,
    pub instrument: String,
    pub direction: Direction,
    pub size: Decimal,
    pub fill_price: Option<Decimal>,
}

/// Executes actions against the broker's authoritative state.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    /// Lists open trades on `instrument`.
    async fn list_open_trades(&self, instrument: &str) -> Result<PositionSnapshot>;

    /// Counts open trades on `instrument`.
    async fn count_open_trades(&self, instrument: &str) -> Result<usize> {
        Ok(self.list_open_trades(instrument).await?.len())
    }

    /// Closes each trade in `ids`, reporting per-trade results.
    ///
    /// A rejected close is a `Failed` outcome, not an error. `Err` is reserved
    /// for failures that prevent attempting the request at all.
    async fn close_trades(&self, ids: &BTreeSet<String>) -> Result<Vec<CloseOutcome>>;

    /// Submits a market order.
    async fn open_position(
        &self,
        instrument: &str,
        direction: Direction,
        size: Decimal,
    ) -> Result<OrderReceipt>;
}
