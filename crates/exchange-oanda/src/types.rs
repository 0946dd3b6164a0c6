//! Wire models for the OANDA v20 REST API.
//!
//! OANDA encodes every decimal quantity (units, prices, P/L) as a JSON string;
//! `rust_decimal` accepts both strings and numbers on deserialisation and
//! writes strings on serialisation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sentiment_trader_core::{Direction, Trade};
use serde::{Deserialize, Serialize};

// =============================================================================
// Trades
// =============================================================================

/// `GET /v3/accounts/{accountID}/openTrades` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTradesResponse {
    #[serde(default)]
    pub trades: Vec<RawTrade>,
    #[serde(rename = "lastTransactionID")]
    pub last_transaction_id: Option<String>,
}

/// A trade as serialised by OANDA.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrade {
    pub id: String,
    pub instrument: String,
    /// Signed: positive for long, negative for short.
    pub initial_units: Decimal,
    pub current_units: Option<Decimal>,
    pub price: Option<Decimal>,
    pub open_time: Option<DateTime<Utc>>,
    pub state: Option<String>,
    #[serde(rename = "unrealizedPL")]
    pub unrealized_pl: Option<Decimal>,
}

impl RawTrade {
    /// Converts to the engine's trade model.
    ///
    /// Direction comes from the sign of the initial units. Returns `None` for a
    /// trade reporting zero units.
    #[must_use]
    pub fn into_trade(self) -> Option<Trade> {
        Trade::from_signed_units(
            self.id,
            self.instrument,
            self.initial_units,
            self.unrealized_pl.unwrap_or_default(),
        )
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Fill or kill.
    Fok,
    /// Immediate or cancel.
    Ioc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionFill {
    Default,
    OpenOnly,
    ReduceFirst,
    ReduceOnly,
}

/// Market order body for `POST /v3/accounts/{accountID}/orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOrderRequest {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub instrument: String,
    /// Signed units; negative sells.
    pub units: Decimal,
    pub time_in_force: TimeInForce,
    pub position_fill: PositionFill,
}

impl MarketOrderRequest {
    /// Creates a fill-or-kill market order for `size` units in `direction`.
    pub fn new(instrument: impl Into<String>, direction: Direction, size: Decimal) -> Self {
        let units = match direction {
            Direction::Long => size.abs(),
            Direction::Short => -size.abs(),
        };
        Self {
            order_type: OrderType::Market,
            instrument: instrument.into(),
            units,
            time_in_force: TimeInForce::Fok,
            position_fill: PositionFill::Default,
        }
    }
}

/// Envelope expected by the orders endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OrderEnvelope<'a> {
    pub order: &'a MarketOrderRequest,
}

/// Body for `PUT /v3/accounts/{accountID}/trades/{tradeSpecifier}/close`.
#[derive(Debug, Clone, Serialize)]
pub struct TradeCloseRequest {
    /// `"ALL"` or a decimal string.
    pub units: String,
}

impl Default for TradeCloseRequest {
    fn default() -> Self {
        Self {
            units: "ALL".to_string(),
        }
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Response to an order create or a trade close.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_create_transaction: Option<Transaction>,
    pub order_fill_transaction: Option<OrderFillTransaction>,
    pub order_cancel_transaction: Option<OrderCancelTransaction>,
    #[serde(rename = "lastTransactionID")]
    pub last_transaction_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFillTransaction {
    pub id: String,
    #[serde(rename = "orderID")]
    pub order_id: Option<String>,
    pub instrument: Option<String>,
    pub units: Option<Decimal>,
    pub price: Option<Decimal>,
    /// Realized P/L of the fill.
    pub pl: Option<Decimal>,
    pub trade_opened: Option<TradeOpen>,
    #[serde(default)]
    pub trades_closed: Vec<TradeReduce>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeOpen {
    #[serde(rename = "tradeID")]
    pub trade_id: String,
    pub units: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeReduce {
    #[serde(rename = "tradeID")]
    pub trade_id: String,
    pub units: Decimal,
    #[serde(rename = "realizedPL")]
    pub realized_pl: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderCancelTransaction {
    pub id: String,
    pub reason: Option<String>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub error_message: Option<String>,
    pub error_code: Option<String>,
}

impl ApiErrorBody {
    /// Best human-readable message: code and message when both are present.
    #[must_use]
    pub fn describe(&self, fallback: &str) -> String {
        match (&self.error_code, &self.error_message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => fallback.to_string(),
        }
    }
}
