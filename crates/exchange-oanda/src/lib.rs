//! OANDA v20 integration for the sentiment trader.
//!
//! This crate provides:
//! - REST client with rate limiting and bearer-token auth
//! - [`BrokerGateway`](sentiment_trader_core::BrokerGateway) implementation
//!   used by the trading cycle
//! - Wire models for trades, orders and transactions
//!
//! # Authentication
//!
//! OANDA authenticates with a personal access token sent as
//! `Authorization: Bearer <token>`. The token is read from `OANDA_API_TOKEN`
//! (or `oanda.api_token` in the config file) and never logged.
//!
//! # API Endpoints
//!
//! - `GET /v3/accounts/{accountID}/openTrades` - List open trades
//! - `PUT /v3/accounts/{accountID}/trades/{tradeID}/close` - Close a trade in full
//! - `POST /v3/accounts/{accountID}/orders` - Submit a market order

pub mod client;
pub mod error;
pub mod gateway;
pub mod types;

pub use client::{OandaClient, OandaClientConfig, OANDA_LIVE_URL, OANDA_PRACTICE_URL};
pub use error::{OandaError, Result};
pub use types::{
    MarketOrderRequest, OpenTradesResponse, OrderResponse, PositionFill, RawTrade, TimeInForce,
    TradeCloseRequest,
};
